//! Per-invocation execution plans.

use serde::{Deserialize, Serialize};

/// The concrete way a tool invocation will run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecMode {
    /// A freshly started, auto-removing container for exactly this call.
    EphemeralImage,
    /// A new process inside the already-running shared container.
    SharedContainerExec,
    /// A direct child process on the host.
    HostProcess,
}

impl std::fmt::Display for ExecMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecMode::EphemeralImage => "ephemeral_image",
            ExecMode::SharedContainerExec => "shared_container_exec",
            ExecMode::HostProcess => "host_process",
        };
        f.write_str(s)
    }
}

/// A resolved execution plan, computed fresh per invocation.
///
/// Produced by the environment probe; never persisted. The probe guarantees
/// the plan names exactly one reachable execution path, or no plan is
/// produced at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub mode: ExecMode,
    /// Image tag (ephemeral mode), container identifier (shared-exec mode,
    /// filled in once the lifecycle manager has the container running), or
    /// resolved binary path (host mode).
    pub reference: String,
    /// Fully assembled command vector: tool binary name plus its arguments,
    /// already validated by the caller.
    pub argv: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_serializes_snake_case() {
        let json = serde_json::to_string(&ExecMode::EphemeralImage).unwrap();
        assert_eq!(json, "\"ephemeral_image\"");
        let json = serde_json::to_string(&ExecMode::SharedContainerExec).unwrap();
        assert_eq!(json, "\"shared_container_exec\"");
        let json = serde_json::to_string(&ExecMode::HostProcess).unwrap();
        assert_eq!(json, "\"host_process\"");
    }

    #[test]
    fn mode_display_matches_wire_names() {
        assert_eq!(ExecMode::EphemeralImage.to_string(), "ephemeral_image");
        assert_eq!(ExecMode::HostProcess.to_string(), "host_process");
    }
}
