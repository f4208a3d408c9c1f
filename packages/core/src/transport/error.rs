//! Transport Error Types
//!
//! Every failed exchange with the Mew service surfaces as a
//! [`TransportError`]. Mutating calls never fall back to fabricated results:
//! a transaction either reached the service with a 2xx answer or the caller
//! gets one of these.

use std::fmt;

use thiserror::Error;

/// Failure class of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The request exceeded its timeout
    Timeout,
    /// The service answered with a non-2xx status
    HttpStatus(u16),
    /// Connection, DNS, TLS or other I/O failure
    Network,
    /// A response body could not be decoded
    Decode,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "Request timed out"),
            Self::HttpStatus(status) => write!(f, "HTTP status {}", status),
            Self::Network => write!(f, "Network error"),
            Self::Decode => write!(f, "Malformed response"),
        }
    }
}

/// Failed request to the Mew service
///
/// # Examples
///
/// ```rust
/// use mew_clipper_core::transport::{TransportError, TransportErrorKind};
///
/// let err = TransportError::http_status(401, "Unauthorized");
/// assert_eq!(err.kind, TransportErrorKind::HttpStatus(401));
/// assert_eq!(err.to_string(), "HTTP status 401: Unauthorized");
/// assert!(!err.is_retryable());
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {detail}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub detail: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, detail)
    }

    pub fn http_status(status: u16, detail: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::HttpStatus(status), detail)
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, detail)
    }

    pub fn decode(detail: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Decode, detail)
    }

    /// Timeouts and connection failures may succeed on a second attempt;
    /// status and decode errors will not
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            TransportErrorKind::Timeout | TransportErrorKind::Network
        )
    }

    /// HTTP status code, when the service answered
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            TransportErrorKind::HttpStatus(status) => Some(status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err.to_string())
        } else if err.is_decode() {
            Self::decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::http_status(status.as_u16(), err.to_string())
        } else {
            Self::network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(TransportError::timeout("slow").is_retryable());
        assert!(TransportError::network("refused").is_retryable());
        assert!(!TransportError::http_status(500, "boom").is_retryable());
        assert!(!TransportError::decode("bad json").is_retryable());
    }

    #[test]
    fn test_display_and_status() {
        let err = TransportError::timeout("after 10s");
        assert_eq!(err.to_string(), "Request timed out: after 10s");
        assert_eq!(err.status(), None);
        assert_eq!(TransportError::http_status(404, "").status(), Some(404));
    }

    #[test]
    fn test_from_serde_error_is_decode() {
        let err: TransportError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.kind, TransportErrorKind::Decode);
    }
}
