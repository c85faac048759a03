//! Execution-environment diagnosis.
//!
//! `scout doctor` -- report, for the runtime and every registered tool,
//! whether an execution path is available and what to fix when none is.

use std::sync::Arc;

use anyhow::Result;

use scout_broker::{
    ContainerRuntime, ContainerState, DockerCli, EnvironmentProbe, PathLocator, ToolRegistry,
    SHARED_CONTAINER_NAME,
};
use scout_types::BrokerError;

/// Severity level for a diagnostic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Ok,
    Warn,
    Fail,
}

/// A single diagnostic check result.
#[derive(Debug, Clone)]
struct CheckResult {
    level: Level,
    message: String,
    fix_hint: Option<String>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            level: Level::Ok,
            message: message.into(),
            fix_hint: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            level: Level::Warn,
            message: message.into(),
            fix_hint: None,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            level: Level::Fail,
            message: message.into(),
            fix_hint: None,
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    fn prefix(&self) -> &str {
        match self.level {
            Level::Ok => "[OK]",
            Level::Warn => "[WARN]",
            Level::Fail => "[FAIL]",
        }
    }
}

/// Summary counts from a set of check results.
#[derive(Debug, Default)]
struct Summary {
    passed: usize,
    warnings: usize,
    failures: usize,
}

impl Summary {
    fn add(&mut self, level: Level) {
        match level {
            Level::Ok => self.passed += 1,
            Level::Warn => self.warnings += 1,
            Level::Fail => self.failures += 1,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} passed, {} warnings, {} failures",
            self.passed, self.warnings, self.failures
        )
    }
}

pub async fn run() -> Result<()> {
    println!("Scout Doctor");
    println!("============");
    println!();

    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerCli::default());
    let mut summary = Summary::default();

    println!("Container runtime");
    let runtime_up = runtime.ping().await;
    let results = check_runtime(runtime.as_ref(), runtime_up).await;
    print_results(&results, &mut summary);
    println!();

    println!("Tools");
    let results = check_tools(Arc::clone(&runtime)).await;
    print_results(&results, &mut summary);
    println!();

    println!("Summary: {summary}");
    if summary.failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

async fn check_runtime(runtime: &dyn ContainerRuntime, runtime_up: bool) -> Vec<CheckResult> {
    let mut results = Vec::new();

    if !runtime_up {
        results.push(
            CheckResult::fail("container runtime unreachable")
                .with_hint("start the Docker daemon; container-backed tools are unavailable"),
        );
        return results;
    }
    results.push(CheckResult::ok("container runtime reachable"));

    match runtime.container_state(SHARED_CONTAINER_NAME).await {
        Ok(ContainerState::Running) => {
            results.push(CheckResult::ok(format!(
                "shared container '{SHARED_CONTAINER_NAME}' running"
            )));
        }
        Ok(ContainerState::Stopped) => {
            results.push(CheckResult::warn(format!(
                "shared container '{SHARED_CONTAINER_NAME}' stopped; it will be started on first use"
            )));
        }
        Ok(ContainerState::Absent) => {
            results.push(CheckResult::warn(format!(
                "shared container '{SHARED_CONTAINER_NAME}' absent; it will be created on first use"
            )));
            match runtime.image_present(scout_types::DEFAULT_SHARED_IMAGE).await {
                Ok(true) => {
                    results.push(CheckResult::ok(format!(
                        "shared image '{}' present locally",
                        scout_types::DEFAULT_SHARED_IMAGE
                    )));
                }
                Ok(false) => {
                    results.push(
                        CheckResult::warn(format!(
                            "shared image '{}' not found locally",
                            scout_types::DEFAULT_SHARED_IMAGE
                        ))
                        .with_hint("build the shared toolbox image before first use"),
                    );
                }
                Err(err) => {
                    results.push(CheckResult::fail(format!(
                        "cannot query shared image: {err}"
                    )));
                }
            }
        }
        Err(err) => {
            results.push(CheckResult::fail(format!(
                "cannot query shared container: {err}"
            )));
        }
    }

    results
}

async fn check_tools(runtime: Arc<dyn ContainerRuntime>) -> Vec<CheckResult> {
    let registry = ToolRegistry::builtin();
    let probe = EnvironmentProbe::new(runtime, Arc::new(PathLocator));
    let mut results = Vec::new();

    for spec in registry.list() {
        match probe.resolve(&spec, &[]).await {
            Ok(plan) => {
                results.push(CheckResult::ok(format!(
                    "{}: {} via {}",
                    spec.name, plan.mode, plan.reference
                )));
            }
            Err(BrokerError::NoExecutionPath { hint, .. }) => {
                results.push(
                    CheckResult::fail(format!("{}: no execution path", spec.name))
                        .with_hint(hint),
                );
            }
            Err(err) => {
                results.push(CheckResult::fail(format!("{}: {err}", spec.name)));
            }
        }
    }

    results
}

fn print_results(results: &[CheckResult], summary: &mut Summary) {
    for result in results {
        println!("  {:<6} {}", result.prefix(), result.message);
        if let Some(hint) = &result.fix_hint {
            println!("         fix: {hint}");
        }
        summary.add(result.level);
    }
}
