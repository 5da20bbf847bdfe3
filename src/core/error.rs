/// litecrud Error Module
///
/// This module defines the error type shared by every database operation.
/// Two families matter to callers: connection errors (no live handle, or the
/// handle could not be opened/closed) and query errors (anything that went
/// wrong while building or executing a statement, including transaction
/// control used out of order).
use thiserror::Error;

/// Error type for litecrud operations.
#[derive(Error, Debug)]
pub enum LiteError {
    /// An operation was attempted without an open connection
    #[error("Connection error: no connection to database")]
    NotConnected,

    /// Opening, configuring or closing the connection failed
    #[error("Connection error: {message}: {source}")]
    Connection {
        message: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Statement construction or execution failed
    #[error("Query error: {message}")]
    Query {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    /// Explicit transaction control was used out of order
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LiteError {
    /// Builds a `Query` error wrapping an engine diagnostic.
    pub(crate) fn query(context: &str, source: rusqlite::Error) -> Self {
        LiteError::Query {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }

    /// Builds a `Query` error raised before anything reached the engine.
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        LiteError::Query {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a `Connection` error wrapping an engine diagnostic.
    pub(crate) fn connection(context: impl Into<String>, source: rusqlite::Error) -> Self {
        LiteError::Connection {
            message: context.into(),
            source,
        }
    }

    /// True for errors caused by a missing, unopenable or unclosable connection.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, LiteError::NotConnected | LiteError::Connection { .. })
    }

    /// True for errors raised while building or executing a statement.
    ///
    /// Out-of-order transaction control counts: it is a rejected `BEGIN`,
    /// `COMMIT` or `ROLLBACK` that never reached the engine.
    pub fn is_query_error(&self) -> bool {
        matches!(self, LiteError::Query { .. } | LiteError::Transaction(_))
    }
}

/// Type alias for Result to use LiteError as the error type.
pub type Result<T> = std::result::Result<T, LiteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LiteError::NotConnected;
        assert_eq!(err.to_string(), "Connection error: no connection to database");

        let query_err = LiteError::query("Query execution failed", rusqlite::Error::InvalidQuery);
        assert!(query_err.to_string().starts_with("Query error: Query execution failed"));

        let config_err = LiteError::Config("missing [database] table".to_string());
        assert!(config_err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_error_kinds() {
        assert!(LiteError::NotConnected.is_connection_error());
        assert!(!LiteError::NotConnected.is_query_error());

        let open_err = LiteError::connection("open failed", rusqlite::Error::InvalidQuery);
        assert!(open_err.is_connection_error());

        let invalid = LiteError::invalid("no columns");
        assert!(invalid.is_query_error());
        assert!(!invalid.is_connection_error());

        let misuse = LiteError::Transaction("No transaction in progress".into());
        assert!(misuse.is_query_error());
        assert!(!misuse.is_connection_error());
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error as _;

        let err = LiteError::query("Failed to prepare statement", rusqlite::Error::InvalidQuery);
        assert!(err.source().is_some());
        assert!(LiteError::invalid("empty").source().is_none());
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LiteError = io_err.into();
        match err {
            LiteError::Io(_) => {}
            _ => panic!("Expected IO error"),
        }
    }
}
