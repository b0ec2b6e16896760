use thiserror::Error;

/// Errors raised while setting up a simulation. Stepping never fails.
#[derive(Error, Debug)]
pub enum PhysicsError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid hull: {0}")]
    InvalidHull(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
