//! Error types for the query layer

use thiserror::Error;

/// Errors reported by a [`crate::DataBackend`] transport
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout error: request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode backend response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

impl BackendError {
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    pub fn status<S: Into<String>>(status: u16, msg: S) -> Self {
        Self::Status {
            status,
            message: msg.into(),
        }
    }

    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Errors raised while reading a declarative filter description
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Filter description must be an object, got {0}")]
    NotAnObject(String),

    #[error("Operator filter on '{field}' has no value")]
    MissingOperatorValue { field: String },

    #[error("Operator on '{field}' must be a string, got {found}")]
    InvalidOperator { field: String, found: String },

    #[error("Disjunction group must be a list of conditions: {0}")]
    InvalidDisjunction(String),
}

/// Errors surfaced by the query executor
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Query was cancelled")]
    Cancelled,

    #[error("Refusing to {operation} every row of '{table}' without a filter")]
    UnfilteredMutation { operation: &'static str, table: String },
}

impl QueryError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        assert!(BackendError::network("connection reset").is_retryable());
        assert!(BackendError::Timeout { duration_ms: 30_000 }.is_retryable());
        assert!(BackendError::status(503, "unavailable").is_retryable());
        assert!(!BackendError::status(400, "bad filter").is_retryable());
        assert!(!BackendError::Decode("not json".to_string()).is_retryable());
    }

    #[test]
    fn test_backend_error_passes_through_query_error() {
        let err: QueryError = BackendError::status(401, "JWT expired").into();
        assert_eq!(err.to_string(), "Backend returned 401: JWT expired");
    }
}
