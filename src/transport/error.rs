use std::fmt;
use thiserror::Error;
use std::error::Error as StdError;

/// Transport-specific error codes
///
/// Codes are grouped by the layer that raised them.
///
/// # Error Code Ranges
///
/// - `-1000` to `-1099`: Connection errors
/// - `-1100` to `-1199`: Message errors
/// - `-1200` to `-1299`: Authentication errors
/// - `-1300` to `-1399`: Dispatch errors
/// - `-1500` to `-1599`: SSE specific errors
/// - `-1600` to `-1699`: Configuration errors
/// - `-1900` to `-1999`: Generic errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorCode {
    // Connection errors
    /// Connection to the hub failed
    ConnectionFailed = -1000,

    // Message errors
    /// Message format is invalid
    InvalidMessage = -1101,

    // Authentication errors
    /// Authentication failed
    AuthenticationFailed = -1202,

    // Dispatch errors
    /// The event dispatcher refused or failed to deliver an event
    DispatchFailed = -1300,
    /// Publishing an update to the hub failed
    PublishFailed = -1301,

    // SSE specific
    /// SSE connection failed to establish
    SseConnectionFailed = -1500,
    /// Error occurred while streaming SSE events
    SseStreamError = -1501,

    // Configuration errors
    /// Hub configuration is missing or invalid
    ConfigError = -1600,

    // Generic errors
    /// Internal transport error
    InternalError = -1900,
}

impl fmt::Display for TransportErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed => write!(f, "Failed to establish connection"),

            Self::InvalidMessage => write!(f, "Invalid message format"),

            Self::AuthenticationFailed => write!(f, "Authentication failed"),

            Self::DispatchFailed => write!(f, "Event dispatch failed"),
            Self::PublishFailed => write!(f, "Publish failed"),

            Self::SseConnectionFailed => write!(f, "SSE connection failed"),
            Self::SseStreamError => write!(f, "SSE stream error"),

            Self::ConfigError => write!(f, "Configuration error"),

            Self::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Transport-specific error type
///
/// Every fallible operation in this crate returns this error. Configuration
/// problems surface once, when the transport is built; dispatch and stream
/// failures propagate to whoever called `request`, `fire_event`, `response`
/// or `fetch`.
///
/// # Examples
///
/// ```
/// use rpc_mercure::transport::{TransportError, TransportErrorCode};
///
/// let error = TransportError::new(
///     TransportErrorCode::ConfigError,
///     "mercure dsn is not configured"
/// );
/// assert_eq!(error.code(), Some(TransportErrorCode::ConfigError));
///
/// match error {
///     TransportError::Transport { code, message, .. } => {
///         println!("Transport error {}: {}", code, message);
///     }
///     TransportError::Http(err) => {
///         println!("HTTP error: {}", err);
///     }
///     _ => {
///         println!("Other error: {}", error);
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("{code}: {message}")]
    /// Transport-specific error
    Transport {
        /// The error code
        code: TransportErrorCode,
        /// Error message
        message: String,
        #[source]
        /// Optional error source
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    #[error("JSON error: {0}")]
    /// JSON serialization/deserialization error
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    /// HTTP error
    Http(#[from] reqwest::Error),

    #[error("Channel error: {0}")]
    /// Channel communication error
    Channel(String),

    #[error("JWT error: {0}")]
    /// JWT token error
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for TransportError {
    fn from(err: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::Channel(err.to_string())
    }
}

impl TransportError {
    /// Create a new transport error
    ///
    /// # Examples
    ///
    /// ```
    /// use rpc_mercure::transport::{TransportError, TransportErrorCode};
    ///
    /// let error = TransportError::new(
    ///     TransportErrorCode::SseConnectionFailed,
    ///     "hub answered 502"
    /// );
    /// ```
    pub fn new(code: TransportErrorCode, message: impl Into<String>) -> Self {
        Self::Transport {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new transport error with source
    pub fn with_source(
        code: TransportErrorCode,
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self::Transport {
            code,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Shorthand for a [`TransportErrorCode::ConfigError`]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(TransportErrorCode::ConfigError, message)
    }

    /// Get the error code if this is a transport error
    ///
    /// # Examples
    ///
    /// ```
    /// use rpc_mercure::transport::{TransportError, TransportErrorCode};
    ///
    /// let error = TransportError::new(TransportErrorCode::DispatchFailed, "listener failed");
    /// assert_eq!(error.code(), Some(TransportErrorCode::DispatchFailed));
    ///
    /// let error = TransportError::Channel("receiver dropped".into());
    /// assert_eq!(error.code(), None);
    /// ```
    pub fn code(&self) -> Option<TransportErrorCode> {
        match self {
            Self::Transport { code, .. } => Some(*code),
            _ => None,
        }
    }
}
