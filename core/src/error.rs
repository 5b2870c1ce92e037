use std::fmt;
use thiserror::Error;

/// The error type for upsign operations
#[derive(Error, Debug)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A storage or delegation URL does not have the expected shape
    EndpointInvalid,

    /// A required parameter is absent (delegation token, date header, etc.)
    ParameterMissing,

    /// A value is present but does not match its required textual format
    FormatInvalid,

    /// Request cannot be signed (no canonical template covers it, bad headers)
    RequestInvalid,

    /// The remote signing endpoint failed (non-200, bad body, transport)
    DelegateFailed,

    /// The operation was cancelled before it completed
    Cancelled,

    /// Unexpected errors (I/O, provider errors, etc.)
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
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

    /// Check if this error was raised before any network call was made
    pub fn is_local(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::EndpointInvalid
                | ErrorKind::ParameterMissing
                | ErrorKind::FormatInvalid
                | ErrorKind::RequestInvalid
        )
    }
}

// Convenience constructors
impl Error {
    /// Create an endpoint invalid error
    pub fn endpoint_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EndpointInvalid, message)
    }

    /// Create a parameter missing error
    pub fn parameter_missing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParameterMissing, message)
    }

    /// Create a format invalid error
    pub fn format_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FormatInvalid, message)
    }

    /// Create a request invalid error
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestInvalid, message)
    }

    /// Create a delegate failed error
    pub fn delegate_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DelegateFailed, message)
    }

    /// Create a cancelled error
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::EndpointInvalid => write!(f, "invalid endpoint"),
            ErrorKind::ParameterMissing => write!(f, "missing parameter"),
            ErrorKind::FormatInvalid => write!(f, "invalid format"),
            ErrorKind::RequestInvalid => write!(f, "invalid request"),
            ErrorKind::DelegateFailed => write!(f, "signing delegate failed"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
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

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
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

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::endpoint_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUriParts> for Error {
    fn from(err: http::uri::InvalidUriParts) -> Self {
        Self::endpoint_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::ToStrError> for Error {
    fn from(err: http::header::ToStrError) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<chrono::ParseError> for Error {
    fn from(err: chrono::ParseError) -> Self {
        Self::format_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}
