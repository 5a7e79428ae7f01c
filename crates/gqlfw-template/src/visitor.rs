use crate::ast::Argument;
use crate::ast::Constraint;
use crate::ast::Expr;
use crate::ast::Field;
use crate::ast::InlineFragment;
use crate::ast::MaxSet;
use crate::ast::ObjectField;
use crate::ast::Operation;
use crate::ast::Selection;

/// Borrowed reference to any node of a template.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Operation(&'a Operation),
    Field(&'a Field),
    InlineFragment(&'a InlineFragment),
    Max(&'a MaxSet),
    Argument(&'a Argument),
    ObjectField(&'a ObjectField),
    Constraint(&'a Constraint),
    Expr(&'a Expr),
}

impl<'a> From<&'a Selection> for NodeRef<'a> {
    fn from(selection: &'a Selection) -> Self {
        match selection {
            Selection::Field(field) => NodeRef::Field(field),
            Selection::InlineFragment(fragment) => NodeRef::InlineFragment(fragment),
            Selection::Max(max) => NodeRef::Max(max),
        }
    }
}

/// What the walk does after visiting a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    SkipChildren,
    Stop,
}

/// Walks `root` depth first in source order, calling `visit` with every
/// node and its depth (the root has depth 0).
///
/// The walk keeps its own stack, so deeply nested templates cannot overflow
/// the call stack. Returns `false` if `visit` stopped the walk.
pub fn walk<'a, F>(root: NodeRef<'a>, mut visit: F) -> bool
where
    F: FnMut(NodeRef<'a>, usize) -> Visit,
{
    let mut stack = vec![(root, 0usize)];
    let mut children = Vec::new();

    while let Some((node, depth)) = stack.pop() {
        match visit(node, depth) {
            Visit::Stop => return false,
            Visit::SkipChildren => continue,
            Visit::Continue => {}
        }

        push_children(node, &mut children);
        stack.extend(children.drain(..).rev().map(|child| (child, depth + 1)));
    }
    true
}

fn push_children<'a>(node: NodeRef<'a>, out: &mut Vec<NodeRef<'a>>) {
    match node {
        NodeRef::Operation(operation) => out.extend(operation.selections.iter().map(NodeRef::from)),
        NodeRef::Field(field) => {
            out.extend(field.arguments.iter().map(NodeRef::Argument));
            out.extend(field.selections.iter().map(NodeRef::from));
        }
        NodeRef::InlineFragment(fragment) => {
            out.extend(fragment.selections.iter().map(NodeRef::from));
        }
        NodeRef::Max(max) => out.extend(max.options.iter().map(NodeRef::from)),
        NodeRef::Argument(argument) => out.push(NodeRef::Constraint(&argument.constraint)),
        NodeRef::ObjectField(field) => out.push(NodeRef::Constraint(&field.constraint)),
        NodeRef::Constraint(constraint) => match constraint {
            Constraint::Any => {}
            Constraint::Equals(expr)
            | Constraint::NotEquals(expr)
            | Constraint::Greater(expr)
            | Constraint::Less(expr)
            | Constraint::GreaterOrEqual(expr)
            | Constraint::LessOrEqual(expr)
            | Constraint::LengthEquals(expr)
            | Constraint::LengthNotEquals(expr)
            | Constraint::LengthGreater(expr)
            | Constraint::LengthLess(expr)
            | Constraint::LengthGreaterOrEqual(expr)
            | Constraint::LengthLessOrEqual(expr) => out.push(NodeRef::Expr(expr)),
            Constraint::Map(inner) | Constraint::Not(inner) => {
                out.push(NodeRef::Constraint(inner));
            }
            Constraint::Object(fields) => out.extend(fields.iter().map(NodeRef::ObjectField)),
            Constraint::And(all) | Constraint::Or(all) => {
                out.extend(all.iter().map(NodeRef::Constraint));
            }
        },
        NodeRef::Expr(expr) => match expr {
            Expr::Null
            | Expr::Bool(_)
            | Expr::Int(_)
            | Expr::Float(_)
            | Expr::String(_)
            | Expr::Enum(_)
            | Expr::Variable(_) => {}
            Expr::Array(items) => out.extend(items.iter().map(NodeRef::Expr)),
            Expr::Object(entries) => out.extend(entries.iter().map(|e| NodeRef::Expr(&e.value))),
            Expr::Negate(inner) | Expr::Not(inner) => out.push(NodeRef::Expr(inner)),
            Expr::Add(left, right)
            | Expr::Sub(left, right)
            | Expr::Mul(left, right)
            | Expr::Div(left, right)
            | Expr::Mod(left, right)
            | Expr::Equal(left, right)
            | Expr::NotEqual(left, right)
            | Expr::Less(left, right)
            | Expr::Greater(left, right)
            | Expr::LessOrEqual(left, right)
            | Expr::GreaterOrEqual(left, right)
            | Expr::And(left, right)
            | Expr::Or(left, right) => {
                out.push(NodeRef::Expr(left));
                out.push(NodeRef::Expr(right));
            }
        },
    }
}
