use thiserror::Error;

/// Main error type for query translation and materialization
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for query operations
pub type Result<T> = std::result::Result<T, QueryError>;

impl QueryError {
    /// Shorthand for a missing or null call argument
    pub fn missing_argument(name: &str) -> Self {
        QueryError::InvalidArgument(format!("{} must not be null", name))
    }

    /// Shorthand for an expression shape the translator does not handle
    pub fn unsupported(what: impl Into<String>) -> Self {
        QueryError::UnsupportedExpression(what.into())
    }

    /// Whether the failure was raised before any request could be built
    pub fn is_translation_error(&self) -> bool {
        matches!(
            self,
            QueryError::InvalidArgument(_) | QueryError::UnsupportedExpression(_)
        )
    }
}
