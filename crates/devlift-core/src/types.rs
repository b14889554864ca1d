//! Workspace lifecycle and server identity types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a workspace runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkspaceStatus {
    /// The runtime is booting; its servers may not be reachable yet.
    Starting,
    /// The runtime is up and its servers can be probed.
    Running,
    /// The runtime is shutting down.
    Stopping,
    /// The runtime is gone.
    Stopped,
}

impl WorkspaceStatus {
    /// Whether the workspace has reached a terminal state for probing
    /// purposes (no probe will ever succeed again).
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkspaceStatus::Stopping | WorkspaceStatus::Stopped)
    }
}

impl fmt::Display for WorkspaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkspaceStatus::Starting => "STARTING",
            WorkspaceStatus::Running => "RUNNING",
            WorkspaceStatus::Stopping => "STOPPING",
            WorkspaceStatus::Stopped => "STOPPED",
        };
        f.write_str(s)
    }
}

/// Identifies one monitored server inside a workspace runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerIdentity {
    /// ID of the workspace the server belongs to.
    pub workspace_id: String,
    /// Name of the machine running the server.
    pub machine_name: String,
    /// Name of the server as known to the workspace runtime.
    pub server_name: String,
}

impl ServerIdentity {
    /// Creates a new identity triple.
    pub fn new(
        workspace_id: impl Into<String>,
        machine_name: impl Into<String>,
        server_name: impl Into<String>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            machine_name: machine_name.into(),
            server_name: server_name.into(),
        }
    }
}

impl fmt::Display for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.workspace_id, self.machine_name, self.server_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!WorkspaceStatus::Starting.is_terminal());
        assert!(!WorkspaceStatus::Running.is_terminal());
        assert!(WorkspaceStatus::Stopping.is_terminal());
        assert!(WorkspaceStatus::Stopped.is_terminal());
    }

    #[test]
    fn identity_display() {
        let id = ServerIdentity::new("ws-1", "dev-machine", "exec-agent");
        assert_eq!(id.to_string(), "ws-1/dev-machine/exec-agent");
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&WorkspaceStatus::Running).unwrap();
        assert_eq!(json, "\"RUNNING\"");
    }
}
