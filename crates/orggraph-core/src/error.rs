use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrgGraphError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Query error: {message} (query: {query})")]
    Query { message: String, query: String },

    #[error("Analytics timed out after {budget_ms}ms")]
    Timeout { budget_ms: u64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrgGraphError {
    /// Wrap a backend failure with the query that triggered it.
    pub fn query(message: impl Into<String>, query: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            query: query.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, OrgGraphError>;
