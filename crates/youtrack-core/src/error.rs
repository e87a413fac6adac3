//! Error types for the YouTrack MCP server.

use thiserror::Error;

/// Main error type for YouTrack MCP operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication failed
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// API returned an error
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response could not be interpreted
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Mutating operation rejected in read-only mode
    #[error("Read-only mode: {0} is disabled")]
    ReadOnly(String),

    /// Tool name not recognized
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Tool arguments did not match the expected shape
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Map an HTTP status code to the matching error variant.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => Error::Auth(message),
            404 => Error::NotFound(message),
            _ => Error::Api { status, message },
        }
    }
}

/// Result type alias for YouTrack MCP operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_auth() {
        assert!(matches!(
            Error::from_status(401, "bad token".into()),
            Error::Auth(_)
        ));
        assert!(matches!(
            Error::from_status(403, "forbidden".into()),
            Error::Auth(_)
        ));
    }

    #[test]
    fn test_from_status_not_found() {
        assert!(matches!(
            Error::from_status(404, "no such issue".into()),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn test_from_status_api() {
        match Error::from_status(500, "boom".into()) {
            Error::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_read_only_display() {
        let err = Error::ReadOnly("youtrack_update_issue".to_string());
        assert_eq!(
            err.to_string(),
            "Read-only mode: youtrack_update_issue is disabled"
        );
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
