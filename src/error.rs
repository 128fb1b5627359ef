use thiserror::Error;

/// Unified error type for release operations
///
/// Every step either fully succeeds or returns one of these; nothing is
/// rolled back, so callers surface the error and stop.
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("invalid format: '{0}'")]
    Format(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("External tool failed: {0}")]
    ExternalTool(String),

    #[error("Issue tracker error: {0}")]
    Tracker(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in gitflow-release
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a version format error for the offending input
    pub fn format(input: impl Into<String>) -> Self {
        ReleaseError::Format(input.into())
    }

    /// Create a validation error with context
    pub fn validation(msg: impl Into<String>) -> Self {
        ReleaseError::Validation(msg.into())
    }

    /// Create an invalid-state error with context
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        ReleaseError::InvalidState(msg.into())
    }

    /// Create a precondition error with context
    pub fn precondition(msg: impl Into<String>) -> Self {
        ReleaseError::Precondition(msg.into())
    }

    /// Create an authentication error with context
    pub fn authentication(msg: impl Into<String>) -> Self {
        ReleaseError::Authentication(msg.into())
    }

    /// Create an external tool error with context
    pub fn external_tool(msg: impl Into<String>) -> Self {
        ReleaseError::ExternalTool(msg.into())
    }

    /// Create an issue tracker error with context
    pub fn tracker(msg: impl Into<String>) -> Self {
        ReleaseError::Tracker(msg.into())
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }
}
