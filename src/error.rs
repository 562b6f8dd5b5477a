//! Error types returned by the configuration API.
//!
//! Ingestion paths never return these; they log and continue.

use thiserror::Error;

use crate::engine::GroupId;

/// Failure reported by the firmware scan dispatch boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("firmware request failed (code {code})")]
pub struct DispatchError {
    /// Negative errno-style code as returned by the firmware layer.
    pub code: i32,
}

impl DispatchError {
    pub const fn new(code: i32) -> Self {
        Self { code }
    }
}

/// Errors from scan group, hotlist and significant-change configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GscanError {
    /// Not enough free buckets in the pool for the request.
    #[error("not enough free buckets: {requested} requested, {available} available")]
    InsufficientCapacity { requested: usize, available: usize },

    /// Memory could not be reserved; the operation did nothing.
    #[error("out of memory")]
    OutOfMemory,

    /// Request parameters failed verification.
    #[error("invalid scan parameters: {0}")]
    InvalidParams(&'static str),

    /// No active scan group with this handle.
    #[error("unknown scan group {0}")]
    UnknownGroup(GroupId),

    /// Starting the firmware scan for one bucket failed; the group was rolled back.
    #[error("failed to start scan for bucket {bucket}")]
    Dispatch {
        bucket: usize,
        #[source]
        source: DispatchError,
    },

    /// The firmware rejected a hotlist or significant-change configuration.
    #[error("firmware rejected configuration")]
    Firmware(#[source] DispatchError),
}

impl From<std::collections::TryReserveError> for GscanError {
    fn from(_: std::collections::TryReserveError) -> Self {
        GscanError::OutOfMemory
    }
}
