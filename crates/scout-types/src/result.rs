//! The result envelope returned to callers.
//!
//! [`ExecutionResult`] is the single outbound type of the broker. It is
//! JSON-serializable with stable field names so the agent binding layer can
//! forward it verbatim.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BrokerError;
use crate::plan::ExecMode;

/// Overall status of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Error,
}

/// Three-way classification of a completed execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeClass {
    /// Ran fine, found nothing to report.
    OkEmpty,
    /// Ran fine, produced data.
    OkWithData,
    Error,
}

/// Classified failure kinds surfaced on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Requested tool name is not in the target registry.
    UnknownTool,
    /// None of image, host binary, or shared container is usable.
    NoExecutionPath,
    /// Creation or start of the shared container failed.
    ContainerLifecycle,
    /// The resolved command could not be spawned at all.
    SpawnFailed,
    /// The process exceeded its deadline (or was cancelled) and was killed.
    Timeout,
    /// The exit code was declared a failure by the tool's policy.
    ToolFailed,
    /// The exit code is not covered by the tool's policy.
    UnexpectedExitCode,
    /// Broker misconfiguration (duplicate registration and the like).
    Config,
}

/// Classified error attached to a failed [`ExecutionResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionError {
    pub kind: ErrorKind,
    /// Human-readable message, including a remediation hint where one
    /// exists, suitable for surfacing directly to an end user.
    pub message: String,
}

/// Outcome of one broker invocation.
///
/// Constructed once, immutable, returned synchronously. The broker keeps
/// no history of past results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub outcome_class: OutcomeClass,
    /// Captured standard output, possibly truncated (see `output_truncated`).
    pub stdout: String,
    /// Captured standard error; always attached, even for successful runs.
    pub stderr: String,
    /// Absent when the process was killed by timeout or cancellation.
    pub exit_code: Option<i32>,
    /// Which execution path actually ran. Absent when the invocation failed
    /// before a plan was resolved.
    pub mode: Option<ExecMode>,
    pub duration_ms: u64,
    /// Set when stdout or stderr exceeded the capture bound and the excess
    /// was dropped. The result is still classified as usual.
    pub output_truncated: bool,
    /// Present only when `status == error`.
    pub error: Option<ExecutionError>,
}

impl ExecutionResult {
    /// A failure envelope with no captured output, for errors raised before
    /// (or instead of) running anything.
    pub fn failure(kind: ErrorKind, message: impl Into<String>, duration: Duration) -> Self {
        Self {
            status: ExecutionStatus::Error,
            outcome_class: OutcomeClass::Error,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            mode: None,
            duration_ms: duration.as_millis() as u64,
            output_truncated: false,
            error: Some(ExecutionError {
                kind,
                message: message.into(),
            }),
        }
    }

    /// Convert a pre-execution [`BrokerError`] into the error envelope.
    pub fn from_broker_error(err: &BrokerError, duration: Duration) -> Self {
        Self::failure(err.kind(), err.to_string(), duration)
    }

    pub fn is_error(&self) -> bool {
        self.status == ExecutionStatus::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_field_names_are_stable() {
        let result = ExecutionResult {
            status: ExecutionStatus::Success,
            outcome_class: OutcomeClass::OkWithData,
            stdout: "data".into(),
            stderr: String::new(),
            exit_code: Some(0),
            mode: Some(ExecMode::HostProcess),
            duration_ms: 42,
            output_truncated: false,
            error: None,
        };

        let json: serde_json::Value = serde_json::to_value(&result).unwrap();
        for field in [
            "status",
            "outcome_class",
            "stdout",
            "stderr",
            "exit_code",
            "mode",
            "duration_ms",
            "output_truncated",
            "error",
        ] {
            assert!(json.get(field).is_some(), "missing wire field: {field}");
        }
        assert_eq!(json["status"], "success");
        assert_eq!(json["outcome_class"], "ok_with_data");
        assert_eq!(json["mode"], "host_process");
        assert!(json["error"].is_null());
    }

    #[test]
    fn killed_result_serializes_null_exit_code() {
        let result = ExecutionResult {
            status: ExecutionStatus::Error,
            outcome_class: OutcomeClass::Error,
            stdout: "partial".into(),
            stderr: String::new(),
            exit_code: None,
            mode: Some(ExecMode::EphemeralImage),
            duration_ms: 30_000,
            output_truncated: false,
            error: Some(ExecutionError {
                kind: ErrorKind::Timeout,
                message: "killed after 30000ms".into(),
            }),
        };

        let json: serde_json::Value = serde_json::to_value(&result).unwrap();
        assert!(json["exit_code"].is_null());
        assert_eq!(json["error"]["kind"], "timeout");
        assert_eq!(json["stdout"], "partial");
    }

    #[test]
    fn failure_envelope_carries_kind_and_message() {
        let err = BrokerError::UnknownTool {
            name: "nonesuch".into(),
        };
        let result = ExecutionResult::from_broker_error(&err, Duration::from_millis(3));

        assert!(result.is_error());
        assert_eq!(result.outcome_class, OutcomeClass::Error);
        let error = result.error.unwrap();
        assert_eq!(error.kind, ErrorKind::UnknownTool);
        assert!(error.message.contains("nonesuch"));
        assert!(result.mode.is_none());
    }
}
