//! Error types for Jenkins client operations

use compact_str::CompactString;
use thiserror::Error;

/// Structured error types for Jenkins client operations
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection failure or transport-level timeout
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// JSON parsing error with endpoint context
    #[error("Failed to parse JSON response from {endpoint}: {message}")]
    JsonParse {
        endpoint: String,
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Credentials missing or rejected (401)
    #[error("Authentication failed")]
    Unauthorized,

    /// Credentials lack the required permission (403)
    #[error("Access denied")]
    Forbidden,

    /// Referenced job or build does not exist (404)
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// Conflicting state, e.g. creating a job that already exists
    #[error("Conflict (HTTP {status}): {message}")]
    Conflict { status: u16, message: CompactString },

    /// Job name is empty or has an empty folder segment
    #[error("Invalid job name: '{name}'")]
    InvalidJobName { name: String },

    /// The queued build was cancelled before it started
    #[error("Queue item {id} was cancelled")]
    QueueItemCancelled { id: u64 },

    /// Server-side failure (5xx)
    #[error("Jenkins server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: CompactString },

    /// Any other non-2xx response
    #[error("Unexpected response (HTTP {status}): {message}")]
    UnexpectedStatus { status: u16, message: CompactString },

    /// Configuration is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration field validation failed
    #[error("Invalid {field}: {message}")]
    ConfigValidation { field: String, message: String },

    /// Gave up waiting for a build
    #[error("Timed out waiting for build")]
    Timeout,

    /// A wait was interrupted through its shutdown channel
    #[error("Wait cancelled")]
    Cancelled,
}

impl ClientError {
    /// Create a JSON parsing error with endpoint context
    pub fn json_parse(
        endpoint: impl Into<String>,
        message: impl Into<String>,
        source: serde_json::Error,
    ) -> Self {
        Self::JsonParse {
            endpoint: endpoint.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a configuration field validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation { field: field.into(), message: message.into() }
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    /// Create a conflict error carrying the status the server answered with
    pub fn conflict(status: u16, message: impl Into<CompactString>) -> Self {
        Self::Conflict { status, message: message.into() }
    }

    /// Map a non-2xx status onto its error kind
    pub fn from_status(status: u16, resource: &str, message: impl Into<CompactString>) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::not_found(resource),
            409 => Self::conflict(status, message),
            500..=599 => Self::ServerError { status, message: message.into() },
            _ => Self::UnexpectedStatus { status, message: message.into() },
        }
    }

    /// HTTP status code behind this error, if it came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthorized => Some(401),
            ClientError::Forbidden => Some(403),
            ClientError::NotFound { .. } => Some(404),
            ClientError::Conflict { status, .. } => Some(*status),
            ClientError::ServerError { status, .. } => Some(*status),
            ClientError::UnexpectedStatus { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }

    /// Check if this error indicates a temporary network issue
    pub fn is_network_error(&self) -> bool {
        match self {
            ClientError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
