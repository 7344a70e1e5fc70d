//! Error types for nosqlmap
//!
//! Errors fall into four groups: precondition failures, query errors,
//! mapping errors and passthrough errors from collaborators.

use thiserror::Error;

/// The main error type for nosqlmap operations
#[derive(Debug, Error)]
pub enum Error {
    // ==========================================================================
    // Precondition Errors
    // ==========================================================================
    #[error("Required collaborator is missing: {what}")]
    Precondition { what: String },

    // ==========================================================================
    // Query Errors
    // ==========================================================================
    #[error(transparent)]
    Parse(#[from] nql::ParseError),

    #[error("Check all the parameters, the parameter '{name}' is not bound")]
    UnboundParameter { name: String },

    #[error("The parameter '{name}' does not exist in the query")]
    UnknownParameter { name: String },

    #[error("The query expects {expected} arguments but {actual} were given")]
    ArgumentCount { expected: usize, actual: usize },

    #[error("Invalid operand for '{field}': {reason}")]
    InvalidOperand { field: String, reason: String },

    #[error("The query returned {count} results, expected at most one")]
    NonUniqueResult { count: usize },

    #[error("The statement was already executed")]
    AlreadyExecuted,

    #[error("The method '{method}' cannot be executed as a {expected} query")]
    MethodKind { method: String, expected: &'static str },

    // ==========================================================================
    // Mapping Errors
    // ==========================================================================
    #[error("Entity '{entity}' does not declare an id field")]
    IdNotFound { entity: String },

    #[error("Entity '{entity}' is not mapped")]
    UnknownEntity { entity: String },

    #[error("Field '{field}' is not mapped in entity '{entity}'")]
    UnknownField { entity: String, field: String },

    #[error("Attribute converter '{name}' is not registered")]
    ConverterNotFound { name: String },

    #[error("Value conversion failed: {message}")]
    Conversion { message: String },

    // ==========================================================================
    // Passthrough
    // ==========================================================================
    #[error(transparent)]
    Backend(anyhow::Error),

    #[error("Failed to parse YAML: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for nosqlmap operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn precondition(what: impl Into<String>) -> Self {
        Error::Precondition { what: what.into() }
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        Error::Conversion {
            message: message.into(),
        }
    }

    /// Wrap a backend failure without altering it
    pub fn backend(err: anyhow::Error) -> Self {
        Error::Backend(err)
    }

    /// Errors raised while parsing, binding or running a query
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            Error::Parse(_)
                | Error::UnboundParameter { .. }
                | Error::UnknownParameter { .. }
                | Error::ArgumentCount { .. }
                | Error::InvalidOperand { .. }
                | Error::NonUniqueResult { .. }
                | Error::AlreadyExecuted
                | Error::MethodKind { .. }
        )
    }

    /// Errors raised while translating between entities and storage
    pub fn is_mapping_error(&self) -> bool {
        matches!(
            self,
            Error::IdNotFound { .. }
                | Error::UnknownEntity { .. }
                | Error::UnknownField { .. }
                | Error::ConverterNotFound { .. }
                | Error::Conversion { .. }
        )
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::Precondition { .. })
    }

    /// The underlying parse error, if any
    pub fn as_parse_error(&self) -> Option<&nql::ParseError> {
        match self {
            Error::Parse(err) => Some(err),
            _ => None,
        }
    }
}
