use std::fmt;

use http::StatusCode;
use thiserror::Error;

/// The error type for reqcall operations
#[derive(Error, Debug)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: Option<StatusCode>,
    #[source]
    source: Option<anyhow::Error>,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No descriptor is registered under the requested name
    DescriptorNotFound,

    /// The descriptor names a signer that is not registered
    SignerNotFound,

    /// The signer rejected the call or failed while running
    SignerExecution,

    /// A script signer could not be compiled at registration
    ScriptCompilation,

    /// Network, DNS or timeout failure reported by the transport
    Transport,

    /// The remote answered with a status other than 200
    NonSuccessStatus,

    /// The caller cancelled the call before it completed
    Cancelled,

    /// Request cannot be built (invalid url, header, etc.)
    RequestInvalid,

    /// Configuration error (missing fields, invalid values)
    ConfigInvalid,

    /// Unexpected errors
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The HTTP status carried by a [`ErrorKind::NonSuccessStatus`] error.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Check if this error was produced by a signer, either at registration or at call time.
    pub fn is_signer_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::SignerNotFound | ErrorKind::SignerExecution | ErrorKind::ScriptCompilation
        )
    }
}

// Convenience constructors
impl Error {
    /// Create a descriptor not found error
    pub fn descriptor_not_found(name: &str) -> Self {
        Self::new(
            ErrorKind::DescriptorNotFound,
            format!("api config `{name}` not found"),
        )
    }

    /// Create a signer not found error
    pub fn signer_not_found(name: &str) -> Self {
        Self::new(
            ErrorKind::SignerNotFound,
            format!("signer `{name}` not supported"),
        )
    }

    /// Create a signer execution error that names the failing signer
    pub fn signer_execution(name: &str, cause: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::SignerExecution,
            format!("signer `{name}` failed: {cause}"),
        )
    }

    /// Create a script compilation error
    pub fn script_compilation(name: &str, cause: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::ScriptCompilation,
            format!("compile script signer `{name}`: {cause}"),
        )
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Create a non-success status error
    pub fn non_success_status(status: StatusCode) -> Self {
        let mut err = Self::new(ErrorKind::NonSuccessStatus, format!("http error: {status}"));
        err.status = Some(status);
        err
    }

    /// Create a cancelled error
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "request cancelled by caller")
    }

    /// Create a request invalid error
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestInvalid, message)
    }

    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::DescriptorNotFound => write!(f, "descriptor not found"),
            ErrorKind::SignerNotFound => write!(f, "signer not found"),
            ErrorKind::SignerExecution => write!(f, "signer execution failed"),
            ErrorKind::ScriptCompilation => write!(f, "script compilation failed"),
            ErrorKind::Transport => write!(f, "transport error"),
            ErrorKind::NonSuccessStatus => write!(f, "non-success status"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
            ErrorKind::RequestInvalid => write!(f, "invalid request"),
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_success_status_carries_status() {
        let err = Error::non_success_status(StatusCode::BAD_GATEWAY);
        assert_eq!(err.kind(), ErrorKind::NonSuccessStatus);
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
        assert_eq!(err.to_string(), "http error: 502 Bad Gateway");
    }

    #[test]
    fn test_signer_errors() {
        let err = Error::signer_execution("hmac", "missing secret");
        assert!(err.is_signer_error());
        assert_eq!(err.to_string(), "signer `hmac` failed: missing secret");

        assert!(!Error::transport("dns").is_signer_error());
        assert!(!Error::cancelled().is_signer_error());
    }
}
