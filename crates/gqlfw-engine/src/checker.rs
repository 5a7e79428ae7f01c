//! Per-argument value constraints.
//!
//! Every constrained template argument is compiled once into a
//! [`Predicate`]: a tree of checks whose operands are small postfix
//! programs. At request time a [`Checker`] evaluates predicates against the
//! reduced operation, reusing its evaluation stack across calls.

mod program;
mod types;
mod value;

use gqlfw_reduce::Operation;
use gqlfw_reduce::Origin;
use gqlfw_reduce::TokenKind;
use gqlfw_schema::Schema;
use gqlfw_schema::TypeRef;
use gqlfw_template::Constraint;
use gqlfw_template::Expr;

use self::program::Op;
use self::program::Program;
pub(crate) use self::program::Scope;
use self::value::Value;
use crate::error::LoadError;
use crate::path::PathHash;
use crate::scan::ArgumentPath;
use crate::scan::ValueRef;

/// Most fields an object constraint may name.
pub const MAX_OBJECT_FIELDS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Relation {
    fn op(self) -> Op {
        match self {
            Relation::Eq => Op::Eq,
            Relation::Ne => Op::Ne,
            Relation::Gt => Op::Gt,
            Relation::Lt => Op::Lt,
            Relation::Ge => Op::Ge,
            Relation::Le => Op::Le,
        }
    }
}

/// Kind of value a comparison operand implies. Checked against the request
/// value when no schema type is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Number,
    String,
    Enum,
    Boolean,
}

impl Kind {
    fn of(expr: &Expr) -> Option<Kind> {
        match expr {
            Expr::Int(_)
            | Expr::Float(_)
            | Expr::Negate(_)
            | Expr::Add(..)
            | Expr::Sub(..)
            | Expr::Mul(..)
            | Expr::Div(..)
            | Expr::Mod(..) => Some(Kind::Number),
            Expr::String(_) => Some(Kind::String),
            Expr::Enum(_) => Some(Kind::Enum),
            Expr::Bool(_)
            | Expr::Equal(..)
            | Expr::NotEqual(..)
            | Expr::Less(..)
            | Expr::Greater(..)
            | Expr::LessOrEqual(..)
            | Expr::GreaterOrEqual(..)
            | Expr::And(..)
            | Expr::Or(..)
            | Expr::Not(_) => Some(Kind::Boolean),
            Expr::Null | Expr::Variable(_) | Expr::Array(_) | Expr::Object(_) => None,
        }
    }

    fn admits(self, operation: &Operation<'_>, position: ValueRef) -> bool {
        let Some(token) = value::token_at(operation, position) else {
            return false;
        };
        match self {
            Kind::Number => matches!(token.kind, TokenKind::Int | TokenKind::Float),
            Kind::String => token.kind == TokenKind::String,
            Kind::Enum => {
                token.kind == TokenKind::Enum
                    || (token.kind == TokenKind::String && token.origin == Origin::Json)
            }
            Kind::Boolean => matches!(token.kind, TokenKind::True | TokenKind::False),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Check {
    Accept,
    Compare {
        relation: Relation,
        operand: Program,
        expect: Option<Kind>,
    },
    Length {
        relation: Relation,
        operand: Program,
    },
    /// `= [...]` or `!= [...]` against a literal array.
    Elements { items: Vec<Check>, negated: bool },
    /// An object with exactly these fields. Negated, at least one field
    /// must fail its check.
    Fields {
        fields: Vec<(String, Check)>,
        negated: bool,
    },
    /// Every array item satisfies the check.
    Each(Box<Check>),
    All(Vec<Check>),
    Any(Vec<Check>),
    Not(Box<Check>),
}

struct Compiler<'a, 't> {
    template: &'a str,
    variables: &'a Scope<'t>,
}

/// Pending work of [`Compiler::constraint`]. Children are compiled onto an
/// output stack before the `Build` step that assembles them.
enum Step<'c> {
    Constraint(&'c Constraint),
    /// Equality against a literal, negated at the top level only.
    Equality(&'c Expr, bool),
    Build(Shape),
}

/// How to assemble the last compiled children into one check.
enum Shape {
    Each,
    Not,
    All(usize),
    Any(usize),
    Elements { count: usize, negated: bool },
    Fields { names: Vec<String>, negated: bool },
}

impl Compiler<'_, '_> {
    fn constraint(&self, constraint: &Constraint) -> Result<Check, LoadError> {
        let mut steps = vec![Step::Constraint(constraint)];
        let mut out: Vec<Check> = Vec::new();

        while let Some(step) = steps.pop() {
            match step {
                Step::Constraint(constraint) => {
                    if let Some(check) = self.leaf(constraint, &mut steps)? {
                        out.push(check);
                    }
                }
                Step::Equality(expr, negated) => match expr {
                    Expr::Array(items) => {
                        steps.push(Step::Build(Shape::Elements {
                            count: items.len(),
                            negated,
                        }));
                        steps.extend(items.iter().rev().map(|item| Step::Equality(item, false)));
                    }
                    Expr::Object(entries) => {
                        self.limit(entries.len())?;
                        steps.push(Step::Build(Shape::Fields {
                            names: entries.iter().map(|entry| entry.name.clone()).collect(),
                            negated,
                        }));
                        steps.extend(
                            entries
                                .iter()
                                .rev()
                                .map(|entry| Step::Equality(&entry.value, false)),
                        );
                    }
                    _ => out.push(Check::Compare {
                        relation: if negated { Relation::Ne } else { Relation::Eq },
                        operand: self.program(expr)?,
                        expect: Kind::of(expr),
                    }),
                },
                Step::Build(shape) => {
                    let check = match shape {
                        Shape::Each => Check::Each(Box::new(single(take(&mut out, 1)))),
                        Shape::Not => Check::Not(Box::new(single(take(&mut out, 1)))),
                        Shape::All(count) => Check::All(take(&mut out, count)),
                        Shape::Any(count) => Check::Any(take(&mut out, count)),
                        Shape::Elements { count, negated } => Check::Elements {
                            items: take(&mut out, count),
                            negated,
                        },
                        Shape::Fields { names, negated } => {
                            let checks = take(&mut out, names.len());
                            Check::Fields {
                                fields: names.into_iter().zip(checks).collect(),
                                negated,
                            }
                        }
                    };
                    out.push(check);
                }
            }
        }

        Ok(single(out))
    }

    /// Compiles a constraint without children, or schedules the children
    /// of a composite one and returns `None`.
    fn leaf<'c>(
        &self,
        constraint: &'c Constraint,
        steps: &mut Vec<Step<'c>>,
    ) -> Result<Option<Check>, LoadError> {
        let compare = |relation, expr: &Expr| -> Result<Option<Check>, LoadError> {
            Ok(Some(Check::Compare {
                relation,
                operand: self.program(expr)?,
                expect: Kind::of(expr),
            }))
        };
        let length = |relation, expr: &Expr| -> Result<Option<Check>, LoadError> {
            Ok(Some(Check::Length {
                relation,
                operand: self.program(expr)?,
            }))
        };

        match constraint {
            Constraint::Any => Ok(Some(Check::Accept)),
            Constraint::Equals(expr) => {
                steps.push(Step::Equality(expr, false));
                Ok(None)
            }
            Constraint::NotEquals(expr) => {
                steps.push(Step::Equality(expr, true));
                Ok(None)
            }
            Constraint::Greater(expr) => compare(Relation::Gt, expr),
            Constraint::Less(expr) => compare(Relation::Lt, expr),
            Constraint::GreaterOrEqual(expr) => compare(Relation::Ge, expr),
            Constraint::LessOrEqual(expr) => compare(Relation::Le, expr),
            Constraint::LengthEquals(expr) => length(Relation::Eq, expr),
            Constraint::LengthNotEquals(expr) => length(Relation::Ne, expr),
            Constraint::LengthGreater(expr) => length(Relation::Gt, expr),
            Constraint::LengthLess(expr) => length(Relation::Lt, expr),
            Constraint::LengthGreaterOrEqual(expr) => length(Relation::Ge, expr),
            Constraint::LengthLessOrEqual(expr) => length(Relation::Le, expr),
            Constraint::Map(inner) => {
                steps.push(Step::Build(Shape::Each));
                steps.push(Step::Constraint(inner));
                Ok(None)
            }
            Constraint::Not(inner) => {
                steps.push(Step::Build(Shape::Not));
                steps.push(Step::Constraint(inner));
                Ok(None)
            }
            Constraint::Object(fields) => {
                self.limit(fields.len())?;
                steps.push(Step::Build(Shape::Fields {
                    names: fields.iter().map(|field| field.name.clone()).collect(),
                    negated: false,
                }));
                steps.extend(
                    fields
                        .iter()
                        .rev()
                        .map(|field| Step::Constraint(&field.constraint)),
                );
                Ok(None)
            }
            Constraint::And(all) => {
                steps.push(Step::Build(Shape::All(all.len())));
                steps.extend(all.iter().rev().map(Step::Constraint));
                Ok(None)
            }
            Constraint::Or(any) => {
                steps.push(Step::Build(Shape::Any(any.len())));
                steps.extend(any.iter().rev().map(Step::Constraint));
                Ok(None)
            }
        }
    }

    fn program(&self, expr: &Expr) -> Result<Program, LoadError> {
        Program::compile(self.template, expr, self.variables)
    }

    fn limit(&self, fields: usize) -> Result<(), LoadError> {
        if fields > MAX_OBJECT_FIELDS {
            return Err(LoadError::TooManyObjectFields {
                template: self.template.to_string(),
                limit: MAX_OBJECT_FIELDS,
            });
        }
        Ok(())
    }
}

/// The last `count` compiled checks, in compilation order.
fn take(out: &mut Vec<Check>, count: usize) -> Vec<Check> {
    out.split_off(out.len().saturating_sub(count))
}

fn single(checks: Vec<Check>) -> Check {
    match <[Check; 1]>::try_from(checks) {
        Ok([check]) => check,
        Err(checks) => Check::All(checks),
    }
}

/// Compiled constraint of one template argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    path: PathHash,
    check: Check,
    ty: Option<TypeRef>,
}

impl Predicate {
    /// Compiles the constraint of `argument`. Unconstrained arguments need
    /// no predicate.
    pub(crate) fn compile(
        template: &str,
        argument: &ArgumentPath<'_>,
        variables: &Scope<'_>,
    ) -> Result<Option<Self>, LoadError> {
        let constraint = &argument.argument.constraint;
        if *constraint == Constraint::Any {
            return Ok(None);
        }
        let compiler = Compiler {
            template,
            variables,
        };
        Ok(Some(Predicate {
            path: argument.hash,
            check: compiler.constraint(constraint)?,
            ty: argument.ty.cloned(),
        }))
    }

    /// Hash of the argument path the predicate applies to.
    #[must_use]
    pub fn path(&self) -> PathHash {
        self.path
    }
}

/// Everything a check can observe about the current request.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub operation: Operation<'a>,
    /// Request values at paths where templates declare variables.
    pub observed: &'a [(PathHash, ValueRef)],
    pub schema: Option<&'a Schema>,
}

#[derive(Debug, Default)]
pub struct Checker {
    stack: Vec<Value>,
}

impl Checker {
    /// Whether the value at `position` satisfies `predicate`. With a schema,
    /// the value must first be assignable to the argument's type.
    pub fn check(&mut self, context: &Context<'_>, predicate: &Predicate, position: ValueRef) -> bool {
        if let (Some(schema), Some(ty)) = (context.schema, &predicate.ty) {
            if !types::assignable(&context.operation, schema, position, ty) {
                tracing::trace!(expected = %ty, "argument value has the wrong type");
                return false;
            }
        }
        self.evaluate(context, &predicate.check, position, predicate.ty.is_none())
    }

    fn evaluate(
        &mut self,
        context: &Context<'_>,
        check: &Check,
        position: ValueRef,
        untyped: bool,
    ) -> bool {
        let operation = &context.operation;
        let position = position.resolve(operation);
        match check {
            Check::Accept => true,
            Check::Compare {
                relation,
                operand,
                expect,
            } => {
                if untyped && expect.is_some_and(|kind| !kind.admits(operation, position)) {
                    return false;
                }
                let Some(right) = operand.evaluate(operation, context.observed, &mut self.stack)
                else {
                    return false;
                };
                let left = value::read(operation, position);
                program::compare(operation, operand.literals(), relation.op(), left, right)
                    .unwrap_or(false)
            }
            Check::Length { relation, operand } => {
                let Some(length) = value::length(operation, position) else {
                    return false;
                };
                let Some(bound) = operand.evaluate(operation, context.observed, &mut self.stack)
                else {
                    return false;
                };
                let length = Value::Int(i32::try_from(length).unwrap_or(i32::MAX));
                program::compare(operation, operand.literals(), relation.op(), length, bound)
                    .unwrap_or(false)
            }
            Check::Elements { items, negated } => {
                if value::token_at(operation, position).map(|t| t.kind) != Some(TokenKind::Array) {
                    return false;
                }
                if value::items(operation, position).count() != items.len() {
                    return *negated;
                }
                let all = value::items(operation, position)
                    .zip(items)
                    .all(|(element, check)| self.evaluate(context, check, element, untyped));
                all != *negated
            }
            Check::Fields { fields, negated } => {
                if !same_fields(operation, position, fields) {
                    return false;
                }
                let all = value::fields(operation, position).all(|(name, value)| {
                    fields
                        .iter()
                        .find(|(field, _)| field == name)
                        .is_some_and(|(_, check)| self.evaluate(context, check, value, untyped))
                });
                all != *negated
            }
            Check::Each(inner) => {
                if value::token_at(operation, position).map(|t| t.kind) == Some(TokenKind::Array) {
                    value::items(operation, position)
                        .all(|element| self.evaluate(context, inner, element, untyped))
                } else {
                    self.evaluate(context, inner, position, untyped)
                }
            }
            Check::All(all) => all
                .iter()
                .all(|check| self.evaluate(context, check, position, untyped)),
            Check::Any(any) => any
                .iter()
                .any(|check| self.evaluate(context, check, position, untyped)),
            Check::Not(inner) => !self.evaluate(context, inner, position, untyped),
        }
    }
}

/// Whether the object at `position` has exactly the named fields, each once.
fn same_fields(operation: &Operation<'_>, position: ValueRef, fields: &[(String, Check)]) -> bool {
    if value::token_at(operation, position).map(|t| t.kind) != Some(TokenKind::Object) {
        return false;
    }
    let mut seen = 0u64;
    for (name, _) in value::fields(operation, position) {
        let Some(index) = fields.iter().position(|(field, _)| field == name) else {
            return false;
        };
        let bit = 1u64 << index;
        if seen & bit != 0 {
            return false;
        }
        seen |= bit;
    }
    seen.count_ones() as usize == fields.len()
}

#[cfg(test)]
mod tests {
    use gqlfw_reduce::Reducer;
    use gqlfw_template::Argument;

    use super::*;
    use crate::path::hash_path;

    fn predicate(constraint: &str, ty: Option<&TypeRef>) -> Predicate {
        let argument = Argument {
            name: "a".into(),
            variable: None,
            constraint: serde_json::from_str(constraint).unwrap(),
        };
        let path = ArgumentPath {
            hash: hash_path("Q.f|a,/a"),
            path: "Q.f|a,/a".into(),
            argument: &argument,
            ty,
        };
        Predicate::compile("t", &path, &Scope::default()).unwrap().unwrap()
    }

    fn accepts(constraint: &str, value: &str) -> bool {
        accepted_by(&predicate(constraint, None), value)
    }

    fn accepted_by(predicate: &Predicate, value: &str) -> bool {
        let body = format!("{{ f(a: {value}) }}");
        let mut reducer = Reducer::new();
        let operation = reducer.reduce(&body, None, None).unwrap();
        let context = Context {
            operation,
            observed: &[],
            schema: None,
        };
        let position = ValueRef {
            table: None,
            offset: 5,
        };
        Checker::default().check(&context, predicate, position)
    }

    #[test]
    fn test_any_needs_no_predicate() {
        let argument = Argument {
            name: "a".into(),
            variable: None,
            constraint: Constraint::Any,
        };
        let path = ArgumentPath {
            hash: 0,
            path: String::new(),
            argument: &argument,
            ty: None,
        };
        assert_eq!(Predicate::compile("t", &path, &Scope::default()), Ok(None));
    }

    mod scalars {
        use super::*;

        #[test]
        fn test_comparisons() {
            assert!(accepts(r#"{"greater": {"int": 10}}"#, "11"));
            assert!(!accepts(r#"{"greater": {"int": 10}}"#, "5"));
            assert!(accepts(r#"{"less_or_equal": {"float": 2.5}}"#, "2.5"));
            assert!(accepts(r#"{"equals": {"string": "a\"b"}}"#, r#""a\"b""#));
            assert!(accepts(r#"{"not_equals": {"enum": "RED"}}"#, "BLUE"));
            assert!(accepts(r#"{"equals": "null"}"#, "null"));
            assert!(accepts(
                r#"{"equals": {"add": [{"int": 40}, {"int": 2}]}}"#,
                "42"
            ));
        }

        #[test]
        fn test_kind_mismatch_fails_both_ways() {
            assert!(!accepts(r#"{"equals": {"int": 1}}"#, r#""1""#));
            assert!(!accepts(r#"{"not_equals": {"int": 1}}"#, r#""1""#));
            assert!(!accepts(r#"{"equals": {"enum": "RED"}}"#, r#""RED""#));
            assert!(!accepts(r#"{"greater": {"int": 1}}"#, "null"));
        }

        #[test]
        fn test_fault_fails() {
            assert!(!accepts(
                r#"{"less": {"div": [{"int": 1}, {"int": 0}]}}"#,
                "0"
            ));
        }

        #[test]
        fn test_lengths() {
            assert!(accepts(r#"{"length_less_or_equal": {"int": 3}}"#, r#""héé""#));
            assert!(!accepts(r#"{"length_less": {"int": 3}}"#, r#""héé""#));
            assert!(accepts(r#"{"length_equals": {"int": 2}}"#, "[1, 2]"));
            assert!(!accepts(r#"{"length_equals": {"int": 2}}"#, "12"));
        }

        #[test]
        fn test_logic() {
            let range = r#"{"and": [{"greater_or_equal": {"int": 1}}, {"less": {"int": 10}}]}"#;
            assert!(accepts(range, "1"));
            assert!(!accepts(range, "10"));
            let either = r#"{"or": [{"equals": {"int": 1}}, {"equals": {"int": 3}}]}"#;
            assert!(accepts(either, "3"));
            assert!(!accepts(either, "2"));
            assert!(accepts(r#"{"not": {"equals": {"int": 1}}}"#, "2"));
        }
    }

    mod composites {
        use super::*;

        #[test]
        fn test_nested_constraints() {
            let items = r#"{"map": {"object": [
                {"name": "id", "constraint": {"greater": {"int": 0}}},
                {"name": "tags", "constraint": {"and": [
                    {"length_less_or_equal": {"int": 2}},
                    {"not": {"equals": {"array": [{"string": "x"}]}}}
                ]}}
            ]}}"#;
            assert!(accepts(items, r#"[{id: 1, tags: ["a"]}, {tags: [], id: 2}]"#));
            assert!(!accepts(items, r#"[{id: 1, tags: ["x"]}]"#));
            assert!(!accepts(items, r#"[{id: 1, tags: ["a", "b", "c"]}]"#));
            assert!(!accepts(items, "[{id: 0, tags: []}]"));

            let nested = r#"{"equals": {"array": [{"array": [{"int": 1}]}, {"int": 2}]}}"#;
            assert!(accepts(nested, "[[1], 2]"));
            assert!(!accepts(nested, "[[2], 2]"));
        }

        #[test]
        fn test_deeply_nested_constraint() {
            let mut constraint = Constraint::Greater(Expr::Int(0));
            for _ in 0..1000 {
                constraint = Constraint::Not(Box::new(constraint));
            }
            let argument = Argument {
                name: "a".into(),
                variable: None,
                constraint,
            };
            let path = ArgumentPath {
                hash: hash_path("Q.f|a,/a"),
                path: "Q.f|a,/a".into(),
                argument: &argument,
                ty: None,
            };
            let predicate = Predicate::compile("t", &path, &Scope::default()).unwrap().unwrap();
            assert!(accepted_by(&predicate, "1"));
            assert!(!accepted_by(&predicate, "0"));
        }

        #[test]
        fn test_array_equality() {
            let equals = r#"{"equals": {"array": [{"int": 1}, {"int": 2}]}}"#;
            assert!(accepts(equals, "[1, 2]"));
            assert!(!accepts(equals, "[1, 3]"));
            assert!(!accepts(equals, "[1]"));
            assert!(!accepts(equals, "1"));

            let differs = r#"{"not_equals": {"array": [{"int": 1}, {"int": 2}]}}"#;
            assert!(accepts(differs, "[1]"));
            assert!(accepts(differs, "[1, 3]"));
            assert!(!accepts(differs, "[1, 2]"));
            assert!(!accepts(differs, "1"));
        }

        #[test]
        fn test_object_equality() {
            let equals = r#"{"equals": {"object": [
                {"name": "x", "value": {"int": 1}},
                {"name": "y", "value": {"string": "s"}}
            ]}}"#;
            assert!(accepts(equals, r#"{y: "s", x: 1}"#));
            assert!(!accepts(equals, r#"{x: 1, y: "t"}"#));
            assert!(!accepts(equals, "{x: 1}"));
            assert!(!accepts(equals, r#"{x: 1, y: "s", z: 2}"#));

            let differs = r#"{"not_equals": {"object": [
                {"name": "x", "value": {"int": 1}},
                {"name": "y", "value": {"string": "s"}}
            ]}}"#;
            assert!(accepts(differs, r#"{x: 2, y: "s"}"#));
            assert!(!accepts(differs, r#"{x: 1, y: "s"}"#));
            assert!(!accepts(differs, "{x: 2}"));
        }

        #[test]
        fn test_object_constraint() {
            let constraint = r#"{"object": [
                {"name": "first", "constraint": {"less_or_equal": {"int": 100}}},
                {"name": "after", "constraint": "any"}
            ]}"#;
            assert!(accepts(constraint, r#"{first: 10, after: "c"}"#));
            assert!(!accepts(constraint, r#"{first: 500, after: "c"}"#));
            assert!(!accepts(constraint, "{first: 10}"));
            assert!(!accepts(constraint, "{first: 10, first: 20, after: 1}"));
        }

        #[test]
        fn test_map() {
            let each = r#"{"map": {"greater": {"int": 0}}}"#;
            assert!(accepts(each, "[1, 2, 3]"));
            assert!(!accepts(each, "[1, 0]"));
            assert!(accepts(each, "[]"));
            assert!(accepts(each, "4"));
        }

        #[test]
        fn test_too_many_fields() {
            let fields: Vec<String> = (0..=MAX_OBJECT_FIELDS)
                .map(|i| format!(r#"{{"name": "f{i}"}}"#))
                .collect();
            let argument = Argument {
                name: "a".into(),
                variable: None,
                constraint: serde_json::from_str(&format!(r#"{{"object": [{}]}}"#, fields.join(",")))
                    .unwrap(),
            };
            let path = ArgumentPath {
                hash: 0,
                path: String::new(),
                argument: &argument,
                ty: None,
            };
            assert_eq!(
                Predicate::compile("t", &path, &Scope::default()),
                Err(LoadError::TooManyObjectFields {
                    template: "t".into(),
                    limit: MAX_OBJECT_FIELDS
                })
            );
        }
    }

    mod variables {
        use super::*;

        #[test]
        fn test_variable_operand() {
            let mut reducer = Reducer::new();
            let operation = reducer
                .reduce(
                    "query ($n: Int) { f(a: 5, limit: $n) }",
                    None,
                    Some(r#"{"n": 10}"#),
                )
                .unwrap();
            let limit = hash_path("Q.f|a,limit,/limit");
            let observed = [(limit, ValueRef { table: None, offset: 7 })];
            let context = Context {
                operation,
                observed: &observed,
                schema: None,
            };

            let mut scope = Scope::default();
            scope.insert("limit", limit);
            let argument = Argument {
                name: "a".into(),
                variable: None,
                constraint: serde_json::from_str(r#"{"less": {"variable": "limit"}}"#).unwrap(),
            };
            let path = ArgumentPath {
                hash: hash_path("Q.f|a,limit,/a"),
                path: "Q.f|a,limit,/a".into(),
                argument: &argument,
                ty: None,
            };
            let predicate = Predicate::compile("t", &path, &scope).unwrap().unwrap();
            let position = ValueRef { table: None, offset: 5 };
            assert!(Checker::default().check(&context, &predicate, position));
        }
    }

    mod schema {
        use super::*;

        #[test]
        fn test_schema_type_gates_checks() {
            let schema: Schema = serde_json::from_str(
                r#"{"types": {
                    "Query": {"kind": "object", "fields": []},
                    "Role": {"kind": "enum", "values": ["ADMIN", "USER"]}
                }}"#,
            )
            .unwrap();
            let role = TypeRef::named("Role");
            let predicate = predicate(r#"{"equals": {"enum": "ADMIN"}}"#, Some(&role));

            let mut reducer = Reducer::new();
            let operation = reducer
                .reduce(
                    "query ($r: Role) { f(a: $r) }",
                    None,
                    Some(r#"{"r": "ADMIN"}"#),
                )
                .unwrap();
            let context = Context {
                operation,
                observed: &[],
                schema: Some(&schema),
            };
            let position = ValueRef { table: None, offset: 5 };
            assert!(Checker::default().check(&context, &predicate, position));

            let mut reducer = Reducer::new();
            let operation = reducer
                .reduce("{ f(a: ROOT) }", None, None)
                .unwrap();
            let context = Context {
                operation,
                observed: &[],
                schema: Some(&schema),
            };
            assert!(!Checker::default().check(&context, &predicate, position));
        }
    }
}
