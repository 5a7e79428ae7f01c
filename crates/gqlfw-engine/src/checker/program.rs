use gqlfw_reduce::Operation;
use gqlfw_template::Expr;
use rustc_hash::FxHashMap;

use super::value;
use super::value::Value;
use crate::error::LoadError;
use crate::path::PathHash;
use crate::scan::ValueRef;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Op {
    Const(Value),
    Literal(u32),
    /// Pushes the request value observed where a template variable is
    /// declared. When aliases repeat that path, the first value in request
    /// order is used; `null` when the path was not observed.
    Load(PathHash),
    Neg,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Not,
    /// Jumps keeping `false` on the stack, otherwise pops and continues.
    JumpUnless(usize),
    /// Jumps keeping `true` on the stack, otherwise pops and continues.
    JumpIf(usize),
    /// Requires the top of the stack to be a boolean.
    Truth,
}

/// A constraint operand compiled to postfix form.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Program {
    ops: Vec<Op>,
    literals: Vec<Expr>,
}

/// Pending work of [`Program::emit`], popped last-in first-out.
enum Step<'e> {
    Expr(&'e Expr),
    Op(Op),
    /// Placeholder for the short-circuit jump of `and`/`or`.
    Branch,
    /// Points the innermost open placeholder past the right operand.
    Patch { and: bool },
}

fn unary<'e>(steps: &mut Vec<Step<'e>>, operand: &'e Expr, op: Op) {
    steps.extend([Step::Op(op), Step::Expr(operand)]);
}

fn binary<'e>(steps: &mut Vec<Step<'e>>, left: &'e Expr, right: &'e Expr, op: Op) {
    steps.extend([Step::Op(op), Step::Expr(right), Step::Expr(left)]);
}

/// Template variables visible to a program, by name.
pub(crate) type Scope<'t> = FxHashMap<&'t str, PathHash>;

impl Program {
    pub(crate) fn compile(template: &str, expr: &Expr, variables: &Scope<'_>) -> Result<Self, LoadError> {
        let mut program = Program {
            ops: Vec::new(),
            literals: Vec::new(),
        };
        program.emit(template, expr, variables)?;
        Ok(program)
    }

    pub(crate) fn literals(&self) -> &[Expr] {
        &self.literals
    }

    fn literal(&mut self, expr: &Expr) {
        let index = u32::try_from(self.literals.len()).unwrap_or(u32::MAX);
        self.literals.push(expr.clone());
        self.ops.push(Op::Literal(index));
    }

    fn emit(&mut self, template: &str, expr: &Expr, variables: &Scope<'_>) -> Result<(), LoadError> {
        let mut steps = vec![Step::Expr(expr)];
        let mut branches = Vec::new();

        while let Some(step) = steps.pop() {
            let expr = match step {
                Step::Expr(expr) => expr,
                Step::Op(op) => {
                    self.ops.push(op);
                    continue;
                }
                Step::Branch => {
                    branches.push(self.ops.len());
                    self.ops.push(Op::Truth);
                    continue;
                }
                Step::Patch { and } => {
                    let end = self.ops.len();
                    if let Some(jump) = branches.pop() {
                        self.ops[jump] = if and {
                            Op::JumpUnless(end)
                        } else {
                            Op::JumpIf(end)
                        };
                    }
                    continue;
                }
            };

            match expr {
                Expr::Null => self.ops.push(Op::Const(Value::Null)),
                Expr::Bool(value) => self.ops.push(Op::Const(Value::Bool(*value))),
                Expr::Int(value) => self.ops.push(Op::Const(Value::Int(*value))),
                Expr::Float(value) => self.ops.push(Op::Const(Value::Float(*value))),
                Expr::String(_) | Expr::Enum(_) => self.literal(expr),
                Expr::Array(_) | Expr::Object(_) => {
                    if !expr.is_constant() {
                        return Err(LoadError::invalid(
                            template,
                            "array and object operands cannot contain expressions",
                        ));
                    }
                    self.literal(expr);
                }
                Expr::Variable(name) => {
                    let hash = variables.get(name.as_str()).ok_or_else(|| LoadError::UndefinedVariable {
                        template: template.to_string(),
                        name: name.clone(),
                    })?;
                    self.ops.push(Op::Load(*hash));
                }
                Expr::Negate(inner) => unary(&mut steps, inner, Op::Neg),
                Expr::Not(inner) => unary(&mut steps, inner, Op::Not),
                Expr::Add(l, r) => binary(&mut steps, l, r, Op::Add),
                Expr::Sub(l, r) => binary(&mut steps, l, r, Op::Sub),
                Expr::Mul(l, r) => binary(&mut steps, l, r, Op::Mul),
                Expr::Div(l, r) => binary(&mut steps, l, r, Op::Div),
                Expr::Mod(l, r) => binary(&mut steps, l, r, Op::Mod),
                Expr::Equal(l, r) => binary(&mut steps, l, r, Op::Eq),
                Expr::NotEqual(l, r) => binary(&mut steps, l, r, Op::Ne),
                Expr::Less(l, r) => binary(&mut steps, l, r, Op::Lt),
                Expr::Greater(l, r) => binary(&mut steps, l, r, Op::Gt),
                Expr::LessOrEqual(l, r) => binary(&mut steps, l, r, Op::Le),
                Expr::GreaterOrEqual(l, r) => binary(&mut steps, l, r, Op::Ge),
                Expr::And(l, r) | Expr::Or(l, r) => {
                    let and = matches!(expr, Expr::And(..));
                    steps.extend([
                        Step::Patch { and },
                        Step::Op(Op::Truth),
                        Step::Expr(&**r),
                        Step::Branch,
                        Step::Expr(&**l),
                    ]);
                }
            }
        }
        Ok(())
    }

    /// Runs the program. `None` means evaluation faulted: a type error,
    /// an overflow or a division by zero.
    pub(crate) fn evaluate(
        &self,
        operation: &Operation<'_>,
        observed: &[(PathHash, ValueRef)],
        stack: &mut Vec<Value>,
    ) -> Option<Value> {
        stack.clear();
        let mut pc = 0;
        while let Some(&op) = self.ops.get(pc) {
            pc += 1;
            match op {
                Op::Const(value) => stack.push(value),
                Op::Literal(index) => stack.push(Value::Literal(index)),
                Op::Load(path) => {
                    let value = observed
                        .iter()
                        .find(|(hash, _)| *hash == path)
                        .map_or(Value::Null, |&(_, position)| value::read(operation, position));
                    stack.push(value);
                }
                Op::Neg => {
                    let value = match stack.pop()? {
                        Value::Int(value) => Value::Int(value.checked_neg()?),
                        Value::Float(value) => Value::Float(-value),
                        _ => return None,
                    };
                    stack.push(value);
                }
                Op::Not => {
                    let Value::Bool(value) = stack.pop()? else {
                        return None;
                    };
                    stack.push(Value::Bool(!value));
                }
                Op::Truth => {
                    if !matches!(stack.last(), Some(Value::Bool(_))) {
                        return None;
                    }
                }
                Op::JumpUnless(target) | Op::JumpIf(target) => {
                    let Some(&Value::Bool(value)) = stack.last() else {
                        return None;
                    };
                    if value == matches!(op, Op::JumpIf(_)) {
                        pc = target;
                    } else {
                        stack.pop();
                    }
                }
                Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Mod => {
                    let right = stack.pop()?;
                    let left = stack.pop()?;
                    stack.push(arithmetic(op, left, right)?);
                }
                Op::Eq | Op::Ne | Op::Lt | Op::Gt | Op::Le | Op::Ge => {
                    let right = stack.pop()?;
                    let left = stack.pop()?;
                    stack.push(Value::Bool(compare(
                        operation,
                        &self.literals,
                        op,
                        left,
                        right,
                    )?));
                }
            }
        }
        stack.pop()
    }
}

/// Applies a comparison operator. Ordering values that have no order is a
/// fault.
pub(crate) fn compare(
    operation: &Operation<'_>,
    literals: &[Expr],
    op: Op,
    left: Value,
    right: Value,
) -> Option<bool> {
    use std::cmp::Ordering;

    match op {
        Op::Eq => Some(value::equal(operation, literals, left, right)),
        Op::Ne => Some(!value::equal(operation, literals, left, right)),
        _ => {
            let ordering = value::order(operation, literals, left, right)?;
            Some(match op {
                Op::Lt => ordering == Ordering::Less,
                Op::Gt => ordering == Ordering::Greater,
                Op::Le => ordering != Ordering::Greater,
                Op::Ge => ordering != Ordering::Less,
                _ => return None,
            })
        }
    }
}

/// Integer arithmetic is checked. An integer division that leaves a
/// remainder produces a float.
fn arithmetic(op: Op, left: Value, right: Value) -> Option<Value> {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        return match op {
            Op::Add => a.checked_add(b).map(Value::Int),
            Op::Sub => a.checked_sub(b).map(Value::Int),
            Op::Mul => a.checked_mul(b).map(Value::Int),
            Op::Div => match a.checked_rem(b)? {
                0 => a.checked_div(b).map(Value::Int),
                _ => Some(Value::Float(f64::from(a) / f64::from(b))),
            },
            Op::Mod => a.checked_rem(b).map(Value::Int),
            _ => None,
        };
    }

    let a = match left {
        Value::Int(value) => f64::from(value),
        Value::Float(value) => value,
        _ => return None,
    };
    let b = match right {
        Value::Int(value) => f64::from(value),
        Value::Float(value) => value,
        _ => return None,
    };
    let result = match op {
        Op::Add => a + b,
        Op::Sub => a - b,
        Op::Mul => a * b,
        Op::Div | Op::Mod if b == 0.0 => return None,
        Op::Div => a / b,
        Op::Mod => a % b,
        _ => return None,
    };
    result.is_finite().then_some(Value::Float(result))
}
