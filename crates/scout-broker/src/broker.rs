//! The broker facade: one call in, one [`ExecutionResult`] out.
//!
//! Control flow per invocation: registry lookup -> probe -> (lifecycle, for
//! shared-container plans only) -> executor -> normalizer. Every failure
//! path, pre-execution included, surfaces as a result with `status ==
//! error` and a populated `error.kind`; nothing is swallowed and nothing is
//! retried here.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use scout_types::{BrokerError, ExecMode, ExecutionResult};
use tokio_util::sync::CancellationToken;

use crate::executor::{CommandExecutor, ExecutorConfig};
use crate::lifecycle::SharedContainerManager;
use crate::probe::{BinaryLocator, EnvironmentProbe, PathLocator};
use crate::registry::ToolRegistry;
use crate::runtime::ContainerRuntime;

/// One tool invocation, as handed over by the agent binding layer.
///
/// `args` are already validated by the caller; the broker passes them
/// through unchanged. The workspace, when present, is assumed to be
/// pre-isolated by the caller (e.g. a per-invocation temp directory).
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub tool: String,
    pub args: Vec<String>,
    pub workspace: Option<PathBuf>,
    /// Overrides the tool's default timeout when set.
    pub timeout: Option<Duration>,
    /// Honored identically to the timeout; scoped to this invocation only.
    pub cancel: CancellationToken,
}

impl InvocationRequest {
    pub fn new(tool: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            tool: tool.into(),
            args,
            workspace: None,
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn workspace(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workspace = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Single-host execution abstraction, invoked synchronously once per tool
/// call. Holds no worker pool and no result history; callers bound their
/// own concurrency.
pub struct Broker {
    registry: ToolRegistry,
    probe: EnvironmentProbe,
    lifecycle: SharedContainerManager,
    executor: CommandExecutor,
}

impl Broker {
    /// Production wiring: builtin registry, PATH-based binary discovery,
    /// default executor limits.
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self::with_parts(
            ToolRegistry::builtin(),
            runtime,
            Arc::new(PathLocator),
            ExecutorConfig::default(),
        )
    }

    /// Explicit wiring for tests and embedders.
    pub fn with_parts(
        registry: ToolRegistry,
        runtime: Arc<dyn ContainerRuntime>,
        locator: Arc<dyn BinaryLocator>,
        executor_config: ExecutorConfig,
    ) -> Self {
        Self {
            registry,
            probe: EnvironmentProbe::new(Arc::clone(&runtime), locator),
            lifecycle: SharedContainerManager::new(runtime),
            executor: CommandExecutor::new(executor_config),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one tool invocation end to end.
    pub async fn invoke(&self, request: InvocationRequest) -> ExecutionResult {
        let started = Instant::now();

        match self.invoke_inner(&request).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(tool = %request.tool, error = %err, "invocation failed");
                ExecutionResult::from_broker_error(&err, started.elapsed())
            }
        }
    }

    async fn invoke_inner(
        &self,
        request: &InvocationRequest,
    ) -> Result<ExecutionResult, BrokerError> {
        let spec = self.registry.lookup(&request.tool)?;
        let mut plan = self.probe.resolve(&spec, &request.args).await?;

        // Only shared-container plans touch the lifecycle manager; ephemeral
        // runs and host processes are fire-and-forget.
        if plan.mode == ExecMode::SharedContainerExec {
            let container = self.lifecycle.ensure_running(&plan.reference).await?;
            plan.reference = container.name;
        }

        let timeout = request.timeout.unwrap_or(spec.default_timeout);
        tracing::info!(
            tool = %spec.name,
            mode = %plan.mode,
            reference = %plan.reference,
            timeout_ms = timeout.as_millis() as u64,
            "executing tool"
        );

        let raw = self
            .executor
            .run(&plan, request.workspace.as_deref(), timeout, &request.cancel)
            .await?;

        let result = crate::normalize::normalize(raw, &spec, plan.mode);
        tracing::debug!(
            tool = %spec.name,
            status = ?result.status,
            outcome = ?result.outcome_class,
            duration_ms = result.duration_ms,
            "invocation finished"
        );
        Ok(result)
    }
}
