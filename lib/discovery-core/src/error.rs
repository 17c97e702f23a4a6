use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors raised while talking to the registry
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Registry transport error: {0}")]
    Transport(String),

    #[error("Registry returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Failed to decode registry response: {0}")]
    Decode(String),

    #[error("Registry call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Registry call cancelled")]
    Cancelled,
}

/// Errors raised when building an identity or health check from bad input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Service {0} must not be empty")]
    EmptyField(&'static str),

    #[error("Port {0} is outside the valid TCP range")]
    InvalidPort(u16),

    #[error("Health check {0} must be non-zero")]
    ZeroDuration(&'static str),

    #[error("Health check timeout {timeout:?} must be shorter than interval {interval:?}")]
    TimeoutNotBelowInterval { timeout: Duration, interval: Duration },

    #[error("Deregister-after {deregister_after:?} must not be shorter than interval {interval:?}")]
    DeregisterBeforeInterval {
        deregister_after: Duration,
        interval: Duration,
    },
}
