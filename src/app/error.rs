use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewsError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl NewsError {
    /// Transport failures may succeed on an explicit retry; everything else
    /// is surfaced as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NewsError::Transport(_))
    }
}

/// Failure to get a usable HTTP response out of the upstream host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

impl From<url::ParseError> for TransportError {
    fn from(e: url::ParseError) -> Self {
        TransportError::InvalidUrl(e.to_string())
    }
}

/// A response body that is malformed or reports a non-"ok" status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct ParseError {
    pub reason: String,
    pub raw: String,
}

impl ParseError {
    pub fn new(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            raw: raw.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NewsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_errors_are_retryable() {
        assert!(NewsError::from(TransportError::Timeout).is_retryable());
        assert!(!NewsError::from(ParseError::new("bad", "{}")).is_retryable());
        assert!(!NewsError::InvalidRequest("empty query".into()).is_retryable());
    }

    #[test]
    fn test_status_accessor() {
        let err = TransportError::Status {
            status: 503,
            body: "unavailable".into(),
        };
        assert_eq!(err.status(), Some(503));
        assert_eq!(TransportError::Timeout.status(), None);
    }

    #[test]
    fn test_display_includes_cause() {
        let err = NewsError::from(TransportError::Status {
            status: 401,
            body: "apiKeyInvalid".into(),
        });
        assert_eq!(err.to_string(), "Transport error: HTTP 401: apiKeyInvalid");
    }
}
