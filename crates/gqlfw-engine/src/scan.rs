//! Path scanning of templates (at load time) and reduced requests (per
//! request). Both sides build their paths with [`PathBuilder`].

use gqlfw_reduce::value_end;
use gqlfw_reduce::Operation;
use gqlfw_reduce::Token;
use gqlfw_reduce::TokenKind;
use gqlfw_schema::FieldDefinition;
use gqlfw_schema::Schema;
use gqlfw_schema::TypeRef;
use gqlfw_template as template;
use gqlfw_template::walk;
use gqlfw_template::Constraint;
use gqlfw_template::NodeRef;
use gqlfw_template::Visit;
use rustc_hash::FxHashSet;

use crate::error::LoadError;
use crate::path::PathBuilder;
use crate::path::PathHash;

/// A structural leaf of a template: a field without selections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub hash: PathHash,
    pub path: String,
    /// Template-local scope owning the leaf.
    pub scope: u32,
}

#[derive(Debug, Clone)]
pub struct ArgumentPath<'t> {
    pub hash: PathHash,
    pub path: String,
    pub argument: &'t template::Argument,
    /// Declared type of the argument when a schema is bound.
    pub ty: Option<&'t TypeRef>,
}

/// Declaration of a template variable at an argument or input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariablePath<'t> {
    pub name: &'t str,
    pub hash: PathHash,
    pub path: String,
}

/// A selection scope. Scope 0 is the template root; every other scope is
/// one option of a `max` set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeDef {
    pub parent: Option<u32>,
    pub combinator: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct TemplatePaths<'t> {
    pub leaves: Vec<Leaf>,
    pub arguments: Vec<ArgumentPath<'t>>,
    pub variables: Vec<VariablePath<'t>>,
    pub scopes: Vec<ScopeDef>,
    /// Limit of every `max` set, by combinator index.
    pub combinators: Vec<u32>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Frame<'t> {
    path_len: usize,
    scope: u32,
    /// Combinator opened by a `max` node; its children open member scopes.
    max: Option<u32>,
    /// Schema type whose fields the children select.
    parent_type: Option<&'t str>,
    /// Definition of the field whose arguments the children are.
    field: Option<&'t FieldDefinition>,
    /// Expected type of the value below this node.
    input: Option<&'t TypeRef>,
    /// Whether the node is below a `[...]` constraint.
    in_list: bool,
}

struct TemplateScanner<'t> {
    id: &'t str,
    schema: Option<&'t Schema>,
    path: PathBuilder,
    frames: Vec<Frame<'t>>,
    out: TemplatePaths<'t>,
}

/// Collects the leaves, arguments, variable declarations, scopes and
/// combinators of the template `id`.
pub fn scan_template<'t>(
    id: &'t str,
    document: &'t template::Operation,
    schema: Option<&'t Schema>,
) -> Result<TemplatePaths<'t>, LoadError> {
    let mut scanner = TemplateScanner {
        id,
        schema,
        path: PathBuilder::default(),
        frames: Vec::new(),
        out: TemplatePaths {
            leaves: Vec::new(),
            arguments: Vec::new(),
            variables: Vec::new(),
            scopes: vec![ScopeDef {
                parent: None,
                combinator: None,
            }],
            combinators: Vec::new(),
        },
    };

    let mut error = None;
    walk(NodeRef::Operation(document), |node, depth| {
        match scanner.visit(node, depth) {
            Ok(visit) => visit,
            Err(err) => {
                error = Some(err);
                Visit::Stop
            }
        }
    });
    match error {
        Some(err) => Err(err),
        None => Ok(scanner.out),
    }
}

fn list_item(ty: &TypeRef) -> &TypeRef {
    match ty.nullable() {
        TypeRef::List(item) => item,
        other => other,
    }
}

impl<'t> TemplateScanner<'t> {
    fn visit(&mut self, node: NodeRef<'t>, depth: usize) -> Result<Visit, LoadError> {
        self.frames.truncate(depth);
        let parent = self.frames.last().copied().unwrap_or_default();
        if depth > 0 {
            self.path.truncate(parent.path_len);
        }

        let mut frame = Frame {
            max: None,
            field: None,
            ..parent
        };
        if let Some(combinator) = parent.max {
            frame.scope = u32::try_from(self.out.scopes.len()).unwrap_or(u32::MAX);
            self.out.scopes.push(ScopeDef {
                parent: Some(parent.scope),
                combinator: Some(combinator),
            });
        }

        match node {
            NodeRef::Operation(operation) => {
                if operation.selections.is_empty() {
                    return Err(LoadError::invalid(self.id, "empty selection set"));
                }
                self.path.reset(operation.kind.path_root());
                frame.scope = 0;
                if let Some(schema) = self.schema {
                    let root = schema.root_type(operation.kind).ok_or_else(|| {
                        LoadError::schema(
                            self.id,
                            format!("the schema has no {:?} root type", operation.kind),
                        )
                    })?;
                    frame.parent_type = Some(root);
                }
            }
            NodeRef::Field(field) => self.field(field, &parent, &mut frame)?,
            NodeRef::InlineFragment(fragment) => {
                if fragment.selections.is_empty() {
                    return Err(LoadError::invalid(self.id, "empty selection set"));
                }
                let condition = fragment.type_condition.as_str();
                if let Some(schema) = self.schema {
                    if !condition.is_empty()
                        && !schema.get(condition).is_some_and(|t| t.is_composite())
                    {
                        return Err(LoadError::schema(
                            self.id,
                            format!("unknown type '{condition}' in type condition"),
                        ));
                    }
                }
                self.path.push_type_condition(condition);
                if !condition.is_empty() {
                    frame.parent_type = Some(condition);
                }
            }
            NodeRef::Max(max) => {
                if max.limit == 0 {
                    return Err(LoadError::invalid(self.id, "max limit must be at least 1"));
                }
                if max.options.is_empty() {
                    return Err(LoadError::invalid(self.id, "empty max set"));
                }
                frame.max = Some(u32::try_from(self.out.combinators.len()).unwrap_or(u32::MAX));
                self.out.combinators.push(max.limit);
            }
            NodeRef::Argument(argument) => {
                self.path.push_input(&argument.name);
                frame.in_list = false;
                frame.input = match (self.schema, parent.field) {
                    (None, _) => None,
                    (Some(_), Some(field)) => Some(
                        &field
                            .argument(&argument.name)
                            .ok_or_else(|| {
                                LoadError::schema(
                                    self.id,
                                    format!(
                                        "unknown argument '{}' on field '{}'",
                                        argument.name, field.name
                                    ),
                                )
                            })?
                            .ty,
                    ),
                    (Some(_), None) => {
                        return Err(LoadError::schema(
                            self.id,
                            format!("unknown argument '{}'", argument.name),
                        ))
                    }
                };
                self.out.arguments.push(ArgumentPath {
                    hash: self.path.hash(),
                    path: self.path.as_str().to_string(),
                    argument,
                    ty: frame.input,
                });
                if let Some(name) = &argument.variable {
                    self.declare(name)?;
                }
            }
            NodeRef::ObjectField(field) => {
                self.path.push_input(&field.name);
                if let (Some(schema), Some(ty)) = (self.schema, parent.input) {
                    let input = schema
                        .input_fields(ty.name())
                        .and_then(|fields| fields.iter().find(|f| f.name == field.name))
                        .ok_or_else(|| {
                            LoadError::schema(
                                self.id,
                                format!("unknown input field '{}' on '{}'", field.name, ty.name()),
                            )
                        })?;
                    frame.input = Some(&input.ty);
                }
                if let Some(name) = &field.variable {
                    if frame.in_list {
                        return Err(LoadError::invalid(
                            self.id,
                            "variables cannot be declared below an array constraint",
                        ));
                    }
                    self.declare(name)?;
                }
            }
            NodeRef::Constraint(Constraint::Map(_)) => {
                frame.in_list = true;
                frame.input = frame.input.map(list_item);
            }
            NodeRef::Constraint(_) => {}
            NodeRef::Expr(_) => return Ok(Visit::SkipChildren),
        }

        frame.path_len = self.path.len();
        self.frames.push(frame);
        Ok(Visit::Continue)
    }

    fn field(
        &mut self,
        field: &'t template::Field,
        parent: &Frame<'t>,
        frame: &mut Frame<'t>,
    ) -> Result<(), LoadError> {
        self.path.push_field(&field.name);
        if !field.arguments.is_empty() {
            let mut names: Vec<&str> = field.arguments.iter().map(|a| a.name.as_str()).collect();
            names.sort_unstable();
            if names.windows(2).any(|pair| pair[0] == pair[1]) {
                return Err(LoadError::invalid(self.id, "argument given more than once"));
            }
            self.path.push_arguments(names);
        }

        if let (Some(schema), Some(parent_type)) = (self.schema, parent.parent_type) {
            if field.name == "__typename" {
                frame.parent_type = None;
            } else {
                let definition = schema.field(parent_type, &field.name).ok_or_else(|| {
                    LoadError::schema(
                        self.id,
                        format!("unknown field '{}' on type '{parent_type}'", field.name),
                    )
                })?;
                frame.field = Some(definition);
                frame.parent_type = Some(definition.ty.name());
            }
        }

        if field.selections.is_empty() {
            let path = self.path.as_str();
            if self.out.leaves.iter().any(|leaf| leaf.path == path) {
                return Err(LoadError::DuplicatePath {
                    template: self.id.to_string(),
                    path: path.to_string(),
                });
            }
            self.out.leaves.push(Leaf {
                hash: self.path.hash(),
                path: path.to_string(),
                scope: frame.scope,
            });
        }
        Ok(())
    }

    fn declare(&mut self, name: &'t str) -> Result<(), LoadError> {
        if self.out.variables.iter().any(|v| v.name == name) {
            return Err(LoadError::RedeclaredVariable {
                template: self.id.to_string(),
                name: name.to_string(),
            });
        }
        self.out.variables.push(VariablePath {
            name,
            hash: self.path.hash(),
            path: self.path.as_str().to_string(),
        });
        Ok(())
    }
}

/// Position of a value in a reduced operation: an index into the token
/// stream (`table` is `None`) or into the value of one variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueRef {
    pub table: Option<u32>,
    pub offset: usize,
}

impl ValueRef {
    pub(crate) fn tokens<'o>(self, operation: &Operation<'o>) -> &'o [Token] {
        match self.table {
            None => operation.tokens(),
            Some(index) => operation.variable(index),
        }
    }

    pub(crate) fn token(self, operation: &Operation<'_>) -> Option<Token> {
        self.tokens(operation).get(self.offset).copied()
    }

    /// Follows a variable reference to the variable's value.
    pub(crate) fn resolve(self, operation: &Operation<'_>) -> Self {
        match self.token(operation) {
            Some(Token {
                kind: TokenKind::Variable(index),
                ..
            }) => ValueRef {
                table: Some(index),
                offset: 0,
            },
            _ => self,
        }
    }
}

/// Paths observed in one request, valid until the next scan.
#[derive(Debug, Clone, Copy)]
pub struct RequestPaths<'s> {
    /// Distinct structural leaves.
    pub leaves: &'s [PathHash],
    /// Every argument occurrence.
    pub arguments: &'s [(PathHash, ValueRef)],
    /// Every value at a path where some template declares a variable.
    pub variables: &'s [(PathHash, ValueRef)],
}

/// Reusable scanner for reduced requests.
#[derive(Debug, Default)]
pub struct RequestScanner {
    path: PathBuilder,
    marks: Vec<usize>,
    names: Vec<usize>,
    leaves: Vec<PathHash>,
    arguments: Vec<(PathHash, ValueRef)>,
    variables: Vec<(PathHash, ValueRef)>,
}

fn path_root(operation: &Operation<'_>) -> &'static str {
    match operation.kind() {
        gqlfw_reduce::OperationKind::Query => "Q",
        gqlfw_reduce::OperationKind::Mutation => "M",
        gqlfw_reduce::OperationKind::Subscription => "S",
    }
}

impl RequestScanner {
    pub fn scan(
        &mut self,
        operation: &Operation<'_>,
        known_variables: &FxHashSet<PathHash>,
    ) -> RequestPaths<'_> {
        self.marks.clear();
        self.leaves.clear();
        self.arguments.clear();
        self.variables.clear();
        self.path.reset(path_root(operation));

        let tokens = operation.tokens();
        let mut index = 1;
        while let Some(token) = tokens.get(index) {
            index += 1;
            match token.kind {
                TokenKind::SelectionSet => self.marks.push(self.path.len()),
                TokenKind::SelectionSetEnd => {
                    self.marks.pop();
                }
                TokenKind::Field => {
                    self.enter_selection();
                    self.path.push_field(operation.text(token));
                    if tokens.get(index).map(|t| t.kind) == Some(TokenKind::ArgumentList) {
                        index = self.arguments(operation, index, known_variables);
                    }
                    if tokens.get(index).map(|t| t.kind) != Some(TokenKind::SelectionSet) {
                        self.leaves.push(self.path.hash());
                    }
                }
                TokenKind::FragmentInline => {
                    self.enter_selection();
                    self.path.push_type_condition(operation.text(token));
                }
                _ => {}
            }
        }

        self.leaves.sort_unstable();
        self.leaves.dedup();
        tracing::trace!(
            leaves = self.leaves.len(),
            arguments = self.arguments.len(),
            variables = self.variables.len(),
            "scanned request"
        );
        RequestPaths {
            leaves: &self.leaves,
            arguments: &self.arguments,
            variables: &self.variables,
        }
    }

    fn enter_selection(&mut self) {
        if let Some(&mark) = self.marks.last() {
            self.path.truncate(mark);
        }
    }

    /// Records the argument list starting at `list` and returns the index
    /// after it.
    fn arguments(
        &mut self,
        operation: &Operation<'_>,
        list: usize,
        known_variables: &FxHashSet<PathHash>,
    ) -> usize {
        let tokens = operation.tokens();
        self.names.clear();
        let mut index = list + 1;
        while tokens
            .get(index)
            .is_some_and(|t| t.kind == TokenKind::ArgumentName)
        {
            self.names.push(index);
            index = value_end(tokens, index + 1);
        }

        self.names
            .sort_unstable_by(|&a, &b| operation.text(&tokens[a]).cmp(operation.text(&tokens[b])));
        self.path
            .push_arguments(self.names.iter().map(|&n| operation.text(&tokens[n])));
        let field = self.path.len();

        for position in 0..self.names.len() {
            let name = self.names[position];
            self.path.push_input(operation.text(&tokens[name]));
            let value = ValueRef {
                table: None,
                offset: name + 1,
            };
            self.arguments.push((self.path.hash(), value));
            if !known_variables.is_empty() {
                self.record_values(operation, value, known_variables);
            }
            self.path.truncate(field);
        }

        // Skip the closing parenthesis.
        index + 1
    }

    fn record_values(
        &mut self,
        operation: &Operation<'_>,
        value: ValueRef,
        known_variables: &FxHashSet<PathHash>,
    ) {
        let hash = self.path.hash();
        if known_variables.contains(&hash) {
            self.variables.push((hash, value));
        }

        let value = value.resolve(operation);
        if value.token(operation).map(|t| t.kind) != Some(TokenKind::Object) {
            return;
        }
        let tokens = value.tokens(operation);
        let mut index = value.offset + 1;
        while let Some(field) = tokens.get(index).filter(|t| t.kind == TokenKind::ObjectField) {
            let len = self.path.len();
            self.path.push_input(operation.text(field));
            let child = ValueRef {
                table: value.table,
                offset: index + 1,
            };
            self.record_values(operation, child, known_variables);
            self.path.truncate(len);
            index = value_end(tokens, index + 1);
        }
    }
}
