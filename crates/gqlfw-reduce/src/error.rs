use serde::Serialize;
use thiserror::Error;

use crate::tokens::ValueSource;

/// Why a request could not be reduced to a single operation.
///
/// Every variant is recoverable; the caller maps it to a client-facing
/// rejection.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ReduceError {
    #[error("syntax error at byte {position}: {reason}")]
    Syntax { position: usize, reason: &'static str },

    #[error("operation {} not found", .name.as_deref().map_or_else(|| "<anonymous>".to_string(), |n| format!("'{n}'")))]
    OperationNotFound { name: Option<String> },

    #[error("the request contains several operations and no operation name was given")]
    AmbiguousAnonymousOperation,

    #[error("operation '{name}' is declared more than once")]
    RedeclaredOperation { name: String },

    #[error("fragment '{name}' is declared more than once")]
    RedeclaredFragment { name: String },

    #[error("variable '${name}' is declared more than once")]
    RedeclaredVariable { name: String },

    #[error("fragment '{name}' is never used")]
    UnusedFragment { name: String },

    #[error("fragment '{name}' is not defined")]
    UndefinedFragment { name: String },

    #[error("variable '${name}' is not defined")]
    UndefinedVariable { name: String },

    #[error("the document declares more than {limit} fragments")]
    FragmentLimitExceeded { limit: usize },

    #[error("fragment recursion: {}", .path.join(" -> "))]
    FragmentRecursion { path: Vec<String> },

    #[error("unexpected value for variable '${variable}' of type {expected} (from {provenance})")]
    UnexpectedValueType {
        variable: String,
        expected: String,
        provenance: ValueSource,
    },

    #[error("missing value for non-null variable '${variable}' of type {expected}")]
    MissingVariableValue { variable: String, expected: String },

    #[error("variables are not valid JSON: {reason}")]
    InvalidVariables { reason: String },

    #[error("variables must be a JSON object")]
    VariablesNotObject,
}

impl ReduceError {
    pub(crate) fn syntax(position: usize, reason: &'static str) -> Self {
        Self::Syntax { position, reason }
    }
}
