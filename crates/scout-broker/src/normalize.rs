//! Result normalizer: raw execution -> classified [`ExecutionResult`].
//!
//! Applies the tool's exit-code policy and the single generic heuristic for
//! telling "ran fine, found nothing" from "ran fine, found data": non-empty
//! stdout after trimming. That heuristic is textual, not semantic -- `"[]"`
//! counts as data; callers needing semantic emptiness must parse stdout
//! themselves.

use scout_types::{
    ErrorKind, ExecMode, ExecutionError, ExecutionResult, ExecutionStatus, ExitOutcome,
    OutcomeClass, ToolSpec,
};

use crate::executor::RawExecution;

/// Classify a raw execution under the tool's exit-code policy.
///
/// stderr is always attached regardless of outcome class: even successful
/// runs emit diagnostics worth surfacing.
pub fn normalize(raw: RawExecution, spec: &ToolSpec, mode: ExecMode) -> ExecutionResult {
    let duration_ms = raw.duration.as_millis() as u64;

    let (status, outcome_class, error) = if raw.killed {
        (
            ExecutionStatus::Error,
            OutcomeClass::Error,
            Some(ExecutionError {
                kind: ErrorKind::Timeout,
                message: format!(
                    "tool '{}' exceeded its deadline after {duration_ms}ms and was killed; \
                     partial output is attached",
                    spec.name
                ),
            }),
        )
    } else {
        match raw.exit_code {
            None => (
                ExecutionStatus::Error,
                OutcomeClass::Error,
                Some(ExecutionError {
                    kind: ErrorKind::UnexpectedExitCode,
                    message: format!("tool '{}' was terminated by a signal", spec.name),
                }),
            ),
            Some(code) => match spec.exit_code_policy.classify(code) {
                Some(ExitOutcome::Success) => {
                    let class = if raw.stdout.trim().is_empty() {
                        OutcomeClass::OkEmpty
                    } else {
                        OutcomeClass::OkWithData
                    };
                    (ExecutionStatus::Success, class, None)
                }
                Some(ExitOutcome::Clean) => {
                    (ExecutionStatus::Success, OutcomeClass::OkEmpty, None)
                }
                Some(ExitOutcome::Findings) => {
                    (ExecutionStatus::Success, OutcomeClass::OkWithData, None)
                }
                Some(ExitOutcome::Failure) => (
                    ExecutionStatus::Error,
                    OutcomeClass::Error,
                    Some(ExecutionError {
                        kind: ErrorKind::ToolFailed,
                        message: format!("tool '{}' failed with exit code {code}", spec.name),
                    }),
                ),
                None => (
                    ExecutionStatus::Error,
                    OutcomeClass::Error,
                    Some(ExecutionError {
                        kind: ErrorKind::UnexpectedExitCode,
                        message: format!(
                            "tool '{}' exited with code {code}, which its exit-code policy \
                             does not cover",
                            spec.name
                        ),
                    }),
                ),
            },
        }
    };

    ExecutionResult {
        status,
        outcome_class,
        stdout: raw.stdout,
        stderr: raw.stderr,
        exit_code: if raw.killed { None } else { raw.exit_code },
        mode: Some(mode),
        duration_ms,
        output_truncated: raw.truncated,
        error,
    }
}
