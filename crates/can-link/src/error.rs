use thiserror::Error;

pub type Result<T, E = LinkError> = core::result::Result<T, E>;

/// Failures at the link layer, as reported by a backend.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("CAN interface not found: {0}")]
    InterfaceNotFound(String),
    #[error("backend does not support {0}")]
    Unsupported(&'static str),
    #[error("I/O failure: {0}")]
    Io(String),
    #[error("timed out waiting for a frame")]
    Timeout,
    #[error("invalid CAN frame: {0}")]
    InvalidFrame(&'static str),
}
