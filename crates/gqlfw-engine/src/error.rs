use gqlfw_schema::SchemaError;
use thiserror::Error;

/// Why a template set could not be compiled. Any of these makes the whole
/// set unusable.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("template '{0}' is declared more than once")]
    DuplicateTemplate(String),

    #[error("paths '{first}' and '{second}' have the same hash")]
    PathHashCollision { first: String, second: String },

    #[error("template '{template}': path '{path}' is selected more than once")]
    DuplicatePath { template: String, path: String },

    #[error("template '{template}': variable '${name}' is not declared")]
    UndefinedVariable { template: String, name: String },

    #[error("template '{template}': variable '${name}' is declared more than once")]
    RedeclaredVariable { template: String, name: String },

    #[error("template '{template}': {reason}")]
    SchemaMismatch { template: String, reason: String },

    #[error("invalid schema: {0}")]
    InvalidSchema(#[from] SchemaError),

    #[error("template '{template}': {reason}")]
    InvalidTemplate {
        template: String,
        reason: &'static str,
    },

    #[error("template '{template}': an object constraint has more than {limit} fields")]
    TooManyObjectFields { template: String, limit: usize },
}

impl LoadError {
    pub(crate) fn invalid(template: &str, reason: &'static str) -> Self {
        Self::InvalidTemplate {
            template: template.to_string(),
            reason,
        }
    }

    pub(crate) fn schema(template: &str, reason: String) -> Self {
        Self::SchemaMismatch {
            template: template.to_string(),
            reason,
        }
    }
}
