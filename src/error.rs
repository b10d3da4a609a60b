//! Error types for the event core.
//!
//! Every fallible public operation reports one of these synchronously.
//! Malformed hardware samples are not errors; ingest drops and logs them.

use thiserror::Error;

/// Errors returned by the event service.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventError {
    /// An argument was rejected (empty mask, off-screen position, bad name).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The handle is unknown or was already unregistered.
    #[error("event handle not found")]
    NotFound,
    /// The registry is at its configured capacity.
    #[error("handler registry is full")]
    ResourceExhausted,
    /// The service was queried before initialization.
    #[error("event service is not initialized")]
    Uninitialized,
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, EventError>;
