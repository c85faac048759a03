//! Container runtime control boundary.
//!
//! The broker needs exactly three primitives from whatever runtime is
//! installed: a liveness check, named-container create/start/query, and
//! local image presence. [`ContainerRuntime`] captures those; [`DockerCli`]
//! implements them by shelling out to the `docker` CLI. Whether control
//! happens over the CLI or a socket API is an implementation choice, not
//! part of the contract, which is why the trait stays this narrow.

use std::process::Stdio;

use async_trait::async_trait;
use scout_types::BrokerError;

/// Observed state of a named container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Absent,
    Stopped,
    Running,
}

/// Control primitives the broker requires from the container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Lightweight liveness check against the runtime daemon. Must not
    /// mutate anything; resolution depends on it being side-effect-free.
    async fn ping(&self) -> bool;

    /// Whether `image` is present in the local cache.
    async fn image_present(&self, image: &str) -> Result<bool, BrokerError>;

    /// Query the state of the named container.
    async fn container_state(&self, name: &str) -> Result<ContainerState, BrokerError>;

    /// Create (but do not start) a named long-lived container from `image`.
    ///
    /// A "name already in use" failure is reported verbatim; the lifecycle
    /// manager decides whether that counts as losing a benign race.
    async fn create_container(&self, name: &str, image: &str) -> Result<(), BrokerError>;

    /// Start a created or stopped container. Starting an already-running
    /// container must succeed (the docker CLI already behaves this way).
    async fn start_container(&self, name: &str) -> Result<(), BrokerError>;
}

/// Production runtime implementation backed by the `docker` CLI.
#[derive(Debug, Clone)]
pub struct DockerCli {
    bin: String,
}

impl DockerCli {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    async fn output(&self, args: &[&str]) -> Result<std::process::Output, BrokerError> {
        tokio::process::Command::new(&self.bin)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                BrokerError::Runtime(format!(
                    "failed to invoke '{}' (is the docker CLI installed?): {e}",
                    self.bin
                ))
            })
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn ping(&self) -> bool {
        match self
            .output(&["version", "--format", "{{.Server.Version}}"])
            .await
        {
            Ok(out) => out.status.success(),
            Err(_) => false,
        }
    }

    async fn image_present(&self, image: &str) -> Result<bool, BrokerError> {
        validate_image_ref(image)?;
        let out = self.output(&["image", "inspect", image]).await?;
        Ok(out.status.success())
    }

    async fn container_state(&self, name: &str) -> Result<ContainerState, BrokerError> {
        let out = self
            .output(&["container", "inspect", "--format", "{{.State.Running}}", name])
            .await?;

        if !out.status.success() {
            // docker reports "No such container" on inspect of a missing name.
            return Ok(ContainerState::Absent);
        }

        match String::from_utf8_lossy(&out.stdout).trim() {
            "true" => Ok(ContainerState::Running),
            _ => Ok(ContainerState::Stopped),
        }
    }

    async fn create_container(&self, name: &str, image: &str) -> Result<(), BrokerError> {
        validate_image_ref(image)?;
        // The shared container has no entrypoint work of its own; it only
        // needs to stay alive so tools can exec inside it.
        let out = self
            .output(&["create", "--name", name, image, "sleep", "infinity"])
            .await?;

        if out.status.success() {
            tracing::info!(container = name, image, "created shared container");
            Ok(())
        } else {
            Err(BrokerError::ContainerLifecycle(format!(
                "failed to create container '{name}' from '{image}': {}",
                String::from_utf8_lossy(&out.stderr).trim()
            )))
        }
    }

    async fn start_container(&self, name: &str) -> Result<(), BrokerError> {
        let out = self.output(&["start", name]).await?;

        if out.status.success() {
            tracing::debug!(container = name, "container started");
            Ok(())
        } else {
            Err(BrokerError::ContainerLifecycle(format!(
                "failed to start container '{name}': {}",
                String::from_utf8_lossy(&out.stderr).trim()
            )))
        }
    }
}

/// Validate an image reference before it reaches a `docker` command line.
///
/// Allowed characters cover standard references like `ubuntu:22.04`,
/// `ghcr.io/owner/repo:v1.0`, and `image@sha256:abc`.
pub fn validate_image_ref(image: &str) -> Result<(), BrokerError> {
    if image.is_empty() {
        return Err(BrokerError::Config("image reference cannot be empty".into()));
    }
    if image.len() > 256 {
        return Err(BrokerError::Config(
            "image reference exceeds 256 characters".into(),
        ));
    }
    for ch in image.chars() {
        if !ch.is_alphanumeric() && !matches!(ch, '-' | '.' | ':' | '/' | '_' | '@') {
            return Err(BrokerError::Config(format!(
                "image reference contains invalid character {ch:?}"
            )));
        }
    }
    if image.starts_with('-') || image.starts_with('.') || image.starts_with(':') {
        return Err(BrokerError::Config(format!(
            "image reference cannot start with {:?}",
            &image[..1]
        )));
    }
    Ok(())
}

/// Validate a workspace path before it is spliced into a volume mount.
///
/// Rejects null bytes, newlines, and `..` components.
pub fn validate_workspace_path(path: &str) -> Result<(), BrokerError> {
    if path.is_empty() {
        return Err(BrokerError::Config("workspace path cannot be empty".into()));
    }
    if path.contains('\0') || path.contains('\n') || path.contains('\r') {
        return Err(BrokerError::Config(
            "workspace path contains a control character".into(),
        ));
    }
    for component in std::path::Path::new(path).components() {
        if matches!(component, std::path::Component::ParentDir) {
            return Err(BrokerError::Config(
                "workspace path contains a '..' component".into(),
            ));
        }
    }
    Ok(())
}
