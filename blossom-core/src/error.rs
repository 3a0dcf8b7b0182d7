use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result type for Blossom operations
pub type BlossomResult<T> = Result<T, BlossomError>;

/// The injected callback that was needed but absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Auth,
    Payment,
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Auth => f.write_str("auth"),
            Handler::Payment => f.write_str("payment"),
        }
    }
}

/// Errors that can occur while talking to Blossom servers
#[derive(Error, Debug)]
pub enum BlossomError {
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Server responded {status}: {message}")]
    Protocol { status: u16, message: String },

    #[error("Server requested {0} but no {0} handler is configured")]
    MissingHandler(Handler),

    #[error("Server requested authorization but auth is disabled for this call")]
    AuthDisabled,

    #[error("Server {server} does not support media uploads")]
    MediaUnsupported { server: String },

    #[error("No server accepted the media upload")]
    NoMediaServer,

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Resolver failed: {source}")]
    Resolver {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl BlossomError {
    /// Wrap a connectivity failure from the underlying HTTP stack
    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            message: error.to_string(),
            source: Box::new(error),
        }
    }

    pub fn protocol<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Protocol {
            status,
            message: message.into(),
        }
    }

    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Turn a callback failure into a BlossomError:
    /// - if it already is one, keep it
    /// - otherwise wrap as `Resolver`
    pub fn from_resolver(err: anyhow::Error) -> Self {
        match err.downcast::<BlossomError>() {
            Ok(blossom) => blossom,
            Err(other) => Self::Resolver {
                source: other.into(),
            },
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// HTTP status carried by protocol errors
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }
}
