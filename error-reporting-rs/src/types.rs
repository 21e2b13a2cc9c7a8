//! # Error Types
//!
//! Errors raised by the reporting adapter's own setup paths (logging,
//! configuration, sink initialization). The reporting pipeline itself never
//! surfaces these to the host; see [`crate::reporting`].

use std::fmt;
use std::error::Error as StdError;

/// A type alias for Result with the error type defaulting to our Error
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categorizes the failures the adapter can run into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or unreadable configuration
    Configuration,
    /// Logging or reporter initialization error
    Initialization,
    /// Secret store lookup failed
    Secrets,
    /// The sink refused or could not accept work
    Sink,
    /// A report could not be serialized
    Serialization,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "Configuration Error"),
            ErrorKind::Initialization => write!(f, "Initialization Error"),
            ErrorKind::Secrets => write!(f, "Secrets Error"),
            ErrorKind::Sink => write!(f, "Sink Error"),
            ErrorKind::Serialization => write!(f, "Serialization Error"),
        }
    }
}

/// Core error type for the reporting adapter
#[derive(Debug)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Detailed error message
    pub message: String,
    /// Underlying cause, if any
    pub cause: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the specified kind and message
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Chains this error with its cause
    pub fn cause<E>(mut self, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.cause = Some(Box::new(cause));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_ref().map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Errors reported by a sink implementation
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Sink is closed")]
    Closed,

    #[error("Sink rejected the event: {0}")]
    Rejected(String),

    #[error("Invalid dsn: {0}")]
    InvalidDsn(String),
}

/// Errors reported by a secrets lookup
#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    #[error("Secret store unavailable: {0}")]
    Unavailable(String),

    #[error("Secret is malformed: {0}")]
    Malformed(String),
}

impl From<SinkError> for Error {
    fn from(err: SinkError) -> Self {
        Self::new(ErrorKind::Sink, err.to_string()).cause(err)
    }
}

impl From<SecretsError> for Error {
    fn from(err: SecretsError) -> Self {
        Self::new(ErrorKind::Secrets, err.to_string()).cause(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::new(ErrorKind::Configuration, format!("Invalid configuration: {}", err)).cause(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorKind::Serialization, format!("JSON error: {}", err)).cause(err)
    }
}
