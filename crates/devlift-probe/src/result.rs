//! Probe outcome events.

use devlift_core::ServerIdentity;
use serde::{Deserialize, Serialize};

/// Debounced outcome of a probe's threshold state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProbeStatus {
    Passed,
    Failed,
}

/// Event delivered to the consumer when a probe crosses a threshold.
///
/// Emitted, never retracted; a later result for the same identity
/// supersedes the earlier one in the consumer's eyes, but both are
/// delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    #[serde(flatten)]
    identity: ServerIdentity,
    status: ProbeStatus,
}

impl ProbeResult {
    pub fn new(identity: ServerIdentity, status: ProbeStatus) -> Self {
        Self { identity, status }
    }

    pub fn passed(identity: ServerIdentity) -> Self {
        Self::new(identity, ProbeStatus::Passed)
    }

    pub fn failed(identity: ServerIdentity) -> Self {
        Self::new(identity, ProbeStatus::Failed)
    }

    pub fn identity(&self) -> &ServerIdentity {
        &self.identity
    }

    pub fn workspace_id(&self) -> &str {
        &self.identity.workspace_id
    }

    pub fn machine_name(&self) -> &str {
        &self.identity.machine_name
    }

    pub fn server_name(&self) -> &str {
        &self.identity.server_name
    }

    pub fn status(&self) -> ProbeStatus {
        self.status
    }
}
