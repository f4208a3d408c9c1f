//! Service Layer Error Types
//!
//! Errors raised by node resolution and the clipper flows. Lower-layer
//! errors are carried unchanged so callers can still tell a timeout from a
//! rejected transaction.

use crate::operations::BuildError;
use crate::transport::TransportError;
use thiserror::Error;

/// Clipper operation errors
///
/// The `Display` text is what the user sees in a failure notification.
#[derive(Error, Debug)]
pub enum ClipperError {
    /// Setup is missing or unusable
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A URL that is not a Mew node URL
    #[error("Invalid node URL: {url}")]
    InvalidNodeUrl { url: String },

    /// Page data handed in by the caller is unusable
    #[error("Invalid page: {reason}")]
    InvalidPage { reason: String },

    /// Request to the Mew service failed
    #[error("Mew request failed: {0}")]
    Transport(#[from] TransportError),

    /// Transaction could not be built
    #[error("Invalid node request: {0}")]
    Build(#[from] BuildError),

    /// Local state could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Persisted state did not have the expected shape
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ClipperError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Setup has not been completed
    pub fn setup_required() -> Self {
        Self::configuration("Please complete setup first")
    }

    /// Create an invalid node URL error
    pub fn invalid_node_url(url: impl Into<String>) -> Self {
        Self::InvalidNodeUrl { url: url.into() }
    }

    /// Create an invalid page error
    pub fn invalid_page(reason: impl Into<String>) -> Self {
        Self::InvalidPage {
            reason: reason.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Underlying transport error, if any
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClipperError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ClipperError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportErrorKind;

    #[test]
    fn test_error_messages() {
        let err = ClipperError::setup_required();
        assert_eq!(
            format!("{}", err),
            "Configuration error: Please complete setup first"
        );

        let err = ClipperError::invalid_node_url("https://example.com");
        assert_eq!(format!("{}", err), "Invalid node URL: https://example.com");

        let err = ClipperError::storage("disk full");
        assert_eq!(format!("{}", err), "Storage error: disk full");
    }

    #[test]
    fn test_wraps_lower_layers() {
        let err: ClipperError = TransportError::http_status(401, "Unauthorized").into();
        assert_eq!(
            format!("{}", err),
            "Mew request failed: HTTP status 401: Unauthorized"
        );
        assert_eq!(
            err.transport().map(|e| e.kind),
            Some(TransportErrorKind::HttpStatus(401))
        );

        let err: ClipperError = BuildError::EmptyAuthor.into();
        assert_eq!(
            format!("{}", err),
            "Invalid node request: Author id must not be empty"
        );
        assert!(err.transport().is_none());
    }
}
