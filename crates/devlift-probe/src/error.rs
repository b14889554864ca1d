//! Probe subsystem error types.
//!
//! Check failures are never errors: they are folded into the threshold
//! state machine and delivered as [`ProbeResult`](crate::ProbeResult)s.
//! The variants here cover construction-time defects and scheduling
//! misuse.

use devlift_core::ServerIdentity;
use thiserror::Error;

/// Errors surfaced by probe construction and scheduling operations.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A `ProbeConfig` field was out of range.
    #[error("invalid probe config: {0}")]
    InvalidConfig(String),

    /// A probe target could not be constructed.
    #[error("invalid probe target: {0}")]
    InvalidTarget(String),

    /// The server identity is already scheduled; the existing task must be
    /// cancelled first.
    #[error("probe already scheduled for {identity}")]
    AlreadyScheduled { identity: ServerIdentity },

    /// The scheduler no longer accepts work.
    #[error("probe scheduler is shut down")]
    ShutDown,

    /// A probe factory failed to manufacture a probe. This indicates a
    /// configuration or programming defect, not an unreachable server.
    #[error("probe factory failed: {0}")]
    Factory(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ProbeError>;
