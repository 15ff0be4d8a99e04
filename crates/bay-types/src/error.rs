use thiserror::Error;

/// Top-level error type for the Bay control plane.
#[derive(Error, Debug)]
pub enum BayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Maximum number of ships reached")]
    CapacityExceeded,

    #[error("Timeout waiting for available ship slot")]
    CapacityTimeout,

    #[error("Provision error: {0}")]
    ProvisionError(String),

    #[error("Ship failed to become ready within the configured timeout")]
    ReadinessTimeout,

    #[error("Forward error: {0}")]
    ForwardError(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Scheduler error: {0}")]
    SchedulerError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Convenience type alias.
pub type Result<T> = std::result::Result<T, BayError>;
