//! Error types shared across all Scout crates.

use crate::result::ErrorKind;

/// Errors raised by the broker before or during execution.
///
/// None of these are retried by the broker itself; retry policy belongs to
/// the caller. Each variant maps onto a wire [`ErrorKind`] via
/// [`BrokerError::kind`].
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The requested tool name is not registered. Caller configuration bug.
    #[error("unknown tool: {name}")]
    UnknownTool { name: String },

    /// No usable execution path. The hint names which of runtime, binary,
    /// and image were found missing, so the caller can report something
    /// actionable.
    #[error("no execution path available for tool {tool}: {hint}")]
    NoExecutionPath { tool: String, hint: String },

    /// Creation or start of the shared container failed.
    #[error("container lifecycle error: {0}")]
    ContainerLifecycle(String),

    /// Talking to the container runtime failed in a way that is not a
    /// simple "daemon unreachable" answer.
    #[error("container runtime error: {0}")]
    Runtime(String),

    /// The resolved command could not be spawned.
    #[error("failed to spawn {command}: {message}")]
    SpawnFailed { command: String, message: String },

    /// Broker misconfiguration, e.g. a duplicate tool registration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl BrokerError {
    /// The wire-level classification for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BrokerError::UnknownTool { .. } => ErrorKind::UnknownTool,
            BrokerError::NoExecutionPath { .. } => ErrorKind::NoExecutionPath,
            BrokerError::ContainerLifecycle(_) | BrokerError::Runtime(_) => {
                ErrorKind::ContainerLifecycle
            }
            BrokerError::SpawnFailed { .. } => ErrorKind::SpawnFailed,
            BrokerError::Config(_) => ErrorKind::Config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_wire_taxonomy() {
        let err = BrokerError::UnknownTool { name: "x".into() };
        assert_eq!(err.kind(), ErrorKind::UnknownTool);

        let err = BrokerError::NoExecutionPath {
            tool: "x".into(),
            hint: "no reachable container runtime and no local binary".into(),
        };
        assert_eq!(err.kind(), ErrorKind::NoExecutionPath);
        assert!(err.to_string().contains("no local binary"));

        let err = BrokerError::ContainerLifecycle("create failed".into());
        assert_eq!(err.kind(), ErrorKind::ContainerLifecycle);

        let err = BrokerError::Runtime("docker CLI not found".into());
        assert_eq!(err.kind(), ErrorKind::ContainerLifecycle);

        let err = BrokerError::SpawnFailed {
            command: "nmap".into(),
            message: "No such file".into(),
        };
        assert_eq!(err.kind(), ErrorKind::SpawnFailed);
    }
}
