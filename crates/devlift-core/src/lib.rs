//! devlift-core — shared platform types.
//!
//! Identity and lifecycle types used by the liveness-probing subsystem and
//! its collaborators: which workspace/machine/server a check belongs to,
//! and where a workspace runtime is in its lifecycle.

pub mod types;

pub use types::{ServerIdentity, WorkspaceStatus};
