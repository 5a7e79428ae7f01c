use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    /// First segment of every path below an operation of this kind.
    #[must_use]
    pub fn path_root(self) -> &'static str {
        match self {
            OperationKind::Query => "Q",
            OperationKind::Mutation => "M",
            OperationKind::Subscription => "S",
        }
    }
}

/// Root of a template: one operation whose selections are the allowed
/// shape of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub selections: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    Field(Field),
    InlineFragment(InlineFragment),
    /// `max N { ... }`: at most `limit` of the options may be selected.
    Max(MaxSet),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<Argument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selections: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineFragment {
    pub type_condition: String,
    pub selections: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxSet {
    pub limit: u32,
    pub options: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    /// Template variable bound to the argument's value, without the `$`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    #[serde(default)]
    pub constraint: Constraint,
}

/// Field of an input object constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectField {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    #[serde(default)]
    pub constraint: Constraint,
}

/// What a value must satisfy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// `*`
    #[default]
    Any,
    Equals(Expr),
    NotEquals(Expr),
    Greater(Expr),
    Less(Expr),
    GreaterOrEqual(Expr),
    LessOrEqual(Expr),
    LengthEquals(Expr),
    LengthNotEquals(Expr),
    LengthGreater(Expr),
    LengthLess(Expr),
    LengthGreaterOrEqual(Expr),
    LengthLessOrEqual(Expr),
    /// `[...] c`: every item of an array satisfies `c`.
    Map(Box<Constraint>),
    /// `{ a: c1, b: c2 }`: an input object with exactly these fields.
    Object(Vec<ObjectField>),
    And(Vec<Constraint>),
    Or(Vec<Constraint>),
    Not(Box<Constraint>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Null,
    Bool(bool),
    Int(i32),
    Float(f64),
    String(String),
    Enum(String),
    Array(Vec<Expr>),
    Object(Vec<ObjectEntry>),
    /// Template variable reference, without the `$`.
    Variable(String),
    Negate(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Mod(Box<Expr>, Box<Expr>),
    Equal(Box<Expr>, Box<Expr>),
    NotEqual(Box<Expr>, Box<Expr>),
    Less(Box<Expr>, Box<Expr>),
    Greater(Box<Expr>, Box<Expr>),
    LessOrEqual(Box<Expr>, Box<Expr>),
    GreaterOrEqual(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// Whether the expression is a literal that needs no evaluation.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Null
            | Expr::Bool(_)
            | Expr::Int(_)
            | Expr::Float(_)
            | Expr::String(_)
            | Expr::Enum(_) => true,
            Expr::Array(items) => items.iter().all(Expr::is_constant),
            Expr::Object(entries) => entries.iter().all(|entry| entry.value.is_constant()),
            _ => false,
        }
    }
}
