//! Environment probe: resolve a [`ToolSpec`] to a concrete [`ExecutionPlan`].
//!
//! Resolution is side-effect-free and fast: it asks the runtime daemon for
//! liveness and the host PATH for a binary, but never pulls images, never
//! creates containers, and never mutates anything. Priority order, strict:
//!
//! 1. official image (runtime reachable) -> ephemeral run
//! 2. same-named host binary -> host process
//! 3. shared image (runtime reachable) -> exec in the shared container
//! 4. nothing usable -> `NoExecutionPath` with remediation hints

use std::path::PathBuf;
use std::sync::Arc;

use scout_types::{BrokerError, ExecMode, ExecutionPlan, ToolSpec};

use crate::runtime::ContainerRuntime;

/// Host binary discovery, injectable so tests control what is "installed".
pub trait BinaryLocator: Send + Sync {
    fn locate(&self, name: &str) -> Option<PathBuf>;
}

/// Production locator backed by the executable search path.
pub struct PathLocator;

impl BinaryLocator for PathLocator {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}

/// Resolves, per invocation, which of the three execution paths is usable.
pub struct EnvironmentProbe {
    runtime: Arc<dyn ContainerRuntime>,
    locator: Arc<dyn BinaryLocator>,
}

impl EnvironmentProbe {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, locator: Arc<dyn BinaryLocator>) -> Self {
        Self { runtime, locator }
    }

    /// Pick exactly one execution path for `spec`, or fail with hints.
    ///
    /// The returned plan's `argv` is the tool binary name followed by the
    /// caller's already-validated arguments. For shared-container plans the
    /// `reference` is the shared image; the lifecycle manager swaps it for
    /// the running container's identifier before execution.
    pub async fn resolve(
        &self,
        spec: &ToolSpec,
        args: &[String],
    ) -> Result<ExecutionPlan, BrokerError> {
        let runtime_up = self.runtime.ping().await;

        if let Some(image) = &spec.official_image {
            if runtime_up {
                tracing::debug!(tool = %spec.name, image = %image, "resolved to ephemeral image");
                return Ok(ExecutionPlan {
                    mode: ExecMode::EphemeralImage,
                    reference: image.clone(),
                    argv: tool_argv(spec, args),
                });
            }
        }

        if let Some(path) = self.locator.locate(&spec.name) {
            tracing::debug!(tool = %spec.name, path = %path.display(), "resolved to host binary");
            return Ok(ExecutionPlan {
                mode: ExecMode::HostProcess,
                reference: path.display().to_string(),
                argv: tool_argv(spec, args),
            });
        }

        if let Some(image) = &spec.shared_image {
            if runtime_up {
                tracing::debug!(tool = %spec.name, image = %image, "resolved to shared container exec");
                return Ok(ExecutionPlan {
                    mode: ExecMode::SharedContainerExec,
                    reference: image.clone(),
                    argv: tool_argv(spec, args),
                });
            }
        }

        Err(BrokerError::NoExecutionPath {
            tool: spec.name.clone(),
            hint: remediation_hint(spec, runtime_up),
        })
    }
}

fn tool_argv(spec: &ToolSpec, args: &[String]) -> Vec<String> {
    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push(spec.name.clone());
    argv.extend_from_slice(args);
    argv
}

/// Name which prerequisites were found missing, so the caller can report
/// something actionable instead of a bare failure.
fn remediation_hint(spec: &ToolSpec, runtime_up: bool) -> String {
    let mut hints = Vec::new();

    if !runtime_up && (spec.official_image.is_some() || spec.shared_image.is_some()) {
        hints.push("container runtime unreachable (is the Docker daemon running?)".to_string());
    }
    hints.push(format!("no '{}' binary on the host PATH", spec.name));
    if spec.is_host_only() {
        hints.push("tool is host-binary-only; install it locally".to_string());
    }

    hints.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scout_types::ToolSpec;

    struct StubRuntime {
        up: bool,
    }

    #[async_trait]
    impl ContainerRuntime for StubRuntime {
        async fn ping(&self) -> bool {
            self.up
        }

        async fn image_present(&self, _image: &str) -> Result<bool, BrokerError> {
            Ok(false)
        }

        async fn container_state(
            &self,
            _name: &str,
        ) -> Result<crate::runtime::ContainerState, BrokerError> {
            Ok(crate::runtime::ContainerState::Absent)
        }

        async fn create_container(&self, _name: &str, _image: &str) -> Result<(), BrokerError> {
            Ok(())
        }

        async fn start_container(&self, _name: &str) -> Result<(), BrokerError> {
            Ok(())
        }
    }

    struct StubLocator {
        known: Vec<String>,
    }

    impl BinaryLocator for StubLocator {
        fn locate(&self, name: &str) -> Option<PathBuf> {
            if self.known.iter().any(|k| k == name) {
                Some(PathBuf::from(format!("/usr/bin/{name}")))
            } else {
                None
            }
        }
    }

    fn probe(up: bool, binaries: &[&str]) -> EnvironmentProbe {
        EnvironmentProbe::new(
            Arc::new(StubRuntime { up }),
            Arc::new(StubLocator {
                known: binaries.iter().map(|s| s.to_string()).collect(),
            }),
        )
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn official_image_wins_over_host_binary() {
        // Both the official image and a host binary are available.
        let spec = ToolSpec::new("alpha").official_image("vendor/alpha:latest");
        let plan = probe(true, &["alpha"])
            .resolve(&spec, &args(&["-v"]))
            .await
            .unwrap();

        assert_eq!(plan.mode, ExecMode::EphemeralImage);
        assert_eq!(plan.reference, "vendor/alpha:latest");
        assert_eq!(plan.argv, vec!["alpha", "-v"]);
    }

    #[tokio::test]
    async fn host_binary_beats_shared_container() {
        let spec = ToolSpec::new("beta");
        let plan = probe(true, &["beta"]).resolve(&spec, &[]).await.unwrap();

        assert_eq!(plan.mode, ExecMode::HostProcess);
        assert_eq!(plan.reference, "/usr/bin/beta");
    }

    #[tokio::test]
    async fn shared_container_is_the_fallback() {
        let spec = ToolSpec::new("beta");
        let plan = probe(true, &[]).resolve(&spec, &[]).await.unwrap();

        assert_eq!(plan.mode, ExecMode::SharedContainerExec);
        assert_eq!(plan.reference, scout_types::DEFAULT_SHARED_IMAGE);
    }

    #[tokio::test]
    async fn official_image_falls_through_when_runtime_down() {
        let spec = ToolSpec::new("alpha").official_image("vendor/alpha:latest");
        let plan = probe(false, &["alpha"]).resolve(&spec, &[]).await.unwrap();

        assert_eq!(plan.mode, ExecMode::HostProcess);
    }

    #[tokio::test]
    async fn no_path_yields_hints() {
        let spec = ToolSpec::new("gamma");
        let err = probe(false, &[]).resolve(&spec, &[]).await.unwrap_err();

        match err {
            BrokerError::NoExecutionPath { tool, hint } => {
                assert_eq!(tool, "gamma");
                assert!(hint.contains("runtime unreachable"));
                assert!(hint.contains("no 'gamma' binary"));
            }
            other => panic!("expected NoExecutionPath, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn host_only_tool_never_resolves_to_a_container() {
        let spec = ToolSpec::new("whois").host_only();

        // Runtime up but no binary: still no path, with an install hint.
        let err = probe(true, &[]).resolve(&spec, &[]).await.unwrap_err();
        match err {
            BrokerError::NoExecutionPath { hint, .. } => {
                assert!(hint.contains("host-binary-only"));
            }
            other => panic!("expected NoExecutionPath, got: {other:?}"),
        }

        let plan = probe(true, &["whois"]).resolve(&spec, &[]).await.unwrap();
        assert_eq!(plan.mode, ExecMode::HostProcess);
    }
}
