//! Core types shared across all Scout crates.
//!
//! Defines the static tool descriptors, per-invocation execution plans,
//! the result envelope returned to callers, and the broker error taxonomy.

pub mod error;
pub mod plan;
pub mod result;
pub mod tool;

pub use error::BrokerError;
pub use plan::{ExecMode, ExecutionPlan};
pub use result::{
    ErrorKind, ExecutionError, ExecutionResult, ExecutionStatus, OutcomeClass,
};
pub use tool::{ExitCodePolicy, ExitOutcome, ExitRule, ToolSpec, DEFAULT_SHARED_IMAGE};
