//! Error types for Tuning Lab.
//!
//! Defines the main error enum used throughout the application. Failures of
//! the external SQL client are not errors: they are reported on a failed
//! [`ExecutionResult`](crate::runner::ExecutionResult) so the caller still
//! receives the diagnostic text.

use axum::http::StatusCode;
use thiserror::Error;

/// Main error type for Tuning Lab operations.
#[derive(Error, Debug)]
pub enum LabError {
    /// Rejected input (empty, missing, oversized, malformed).
    #[error("Invalid input: {0}")]
    Input(String),

    /// The script was rejected by the statement policy.
    #[error("Blocked: {0}")]
    Policy(String),

    /// The client sent requests faster than the cooldown allows.
    #[error("Rate limited. Please wait {0}.")]
    RateLimited(String),

    /// Configuration errors (invalid config file, bad values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local I/O failures outside the external process (reading scripts, binding sockets).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal application errors (panicked tasks, unexpected states).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LabError {
    /// Creates an input error with the given message.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Creates a policy error with the given reason.
    pub fn policy(reason: impl Into<String>) -> Self {
        Self::Policy(reason.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Input(_) => "Input Error",
            Self::Policy(_) => "Policy Violation",
            Self::RateLimited(_) => "Rate Limited",
            Self::Config(_) => "Configuration Error",
            Self::Io(_) => "I/O Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// HTTP status the API answers with for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Input(_) => StatusCode::BAD_REQUEST,
            Self::Policy(_) => StatusCode::FORBIDDEN,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to hand back to an untrusted client.
    ///
    /// Internal details stay in the logs; the client only sees a generic line.
    pub fn client_message(&self) -> String {
        match self {
            Self::Input(msg) => msg.clone(),
            Self::Policy(_) | Self::RateLimited(_) => self.to_string(),
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

/// Result type alias using LabError.
pub type Result<T> = std::result::Result<T, LabError>;
