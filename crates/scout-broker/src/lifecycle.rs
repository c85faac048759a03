//! Lifecycle of the single shared long-lived container.
//!
//! State machine: `absent -> creating -> running`, `stopped -> running`,
//! `running -> running` (no-op). The manager only ever creates or starts
//! the container; stopping and deleting it belongs to external tooling.
//! First-time creation is the one critical section in the whole broker:
//! everything else runs with unbounded concurrency.

use std::sync::Arc;

use scout_types::BrokerError;
use tokio::sync::Mutex;

use crate::runtime::{ContainerRuntime, ContainerState};

/// Well-known identifier for the shared container, fixed so that all broker
/// instances and all concurrent invocations converge on the same container.
pub const SHARED_CONTAINER_NAME: &str = "scout-toolbox";

/// A running (or at least observed) shared container.
#[derive(Debug, Clone)]
pub struct SharedContainer {
    pub name: String,
    pub image: String,
    pub state: ContainerState,
}

/// Owns creation, start, and reuse of the shared container.
pub struct SharedContainerManager {
    runtime: Arc<dyn ContainerRuntime>,
    name: String,
    create_lock: Mutex<()>,
}

impl SharedContainerManager {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self::with_name(runtime, SHARED_CONTAINER_NAME)
    }

    /// Override the container name. Used by tests to avoid colliding with a
    /// real deployment on the same host.
    pub fn with_name(runtime: Arc<dyn ContainerRuntime>, name: impl Into<String>) -> Self {
        Self {
            runtime,
            name: name.into(),
            create_lock: Mutex::new(()),
        }
    }

    pub fn container_name(&self) -> &str {
        &self.name
    }

    /// Guarantee the shared container is running, creating and starting it
    /// as needed. Idempotent; failures are surfaced without retry.
    pub async fn ensure_running(&self, image: &str) -> Result<SharedContainer, BrokerError> {
        match self.runtime.container_state(&self.name).await? {
            ContainerState::Running => Ok(self.running(image)),
            ContainerState::Stopped => {
                self.runtime.start_container(&self.name).await?;
                Ok(self.running(image))
            }
            ContainerState::Absent => self.create_and_start(image).await,
        }
    }

    async fn create_and_start(&self, image: &str) -> Result<SharedContainer, BrokerError> {
        let _guard = self.create_lock.lock().await;

        // Re-check under the lock: a concurrent invocation may have won the
        // race while we waited.
        match self.runtime.container_state(&self.name).await? {
            ContainerState::Running => return Ok(self.running(image)),
            ContainerState::Stopped => {
                self.runtime.start_container(&self.name).await?;
                return Ok(self.running(image));
            }
            ContainerState::Absent => {}
        }

        if let Err(err) = self.runtime.create_container(&self.name, image).await {
            // Another broker process may have created it between our state
            // query and the create call. The loser of that race sees a
            // "name already in use" conflict, which means someone else
            // succeeded, not that we failed.
            if !name_conflict(&err) {
                return Err(err);
            }
            tracing::debug!(container = %self.name, "lost creation race, reusing existing container");
        }

        self.runtime.start_container(&self.name).await?;
        Ok(self.running(image))
    }

    fn running(&self, image: &str) -> SharedContainer {
        SharedContainer {
            name: self.name.clone(),
            image: image.to_string(),
            state: ContainerState::Running,
        }
    }
}

/// Does this error describe a container-name conflict from a lost creation
/// race? Matches the docker daemon's wording.
fn name_conflict(err: &BrokerError) -> bool {
    let msg = err.to_string();
    msg.contains("already in use") || msg.contains("Conflict")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Mock runtime with scriptable state transitions and call counters.
    struct MockRuntime {
        state: StdMutex<ContainerState>,
        create_calls: AtomicUsize,
        start_calls: AtomicUsize,
        fail_create_with: Option<String>,
    }

    impl MockRuntime {
        fn with_state(state: ContainerState) -> Arc<Self> {
            Arc::new(Self {
                state: StdMutex::new(state),
                create_calls: AtomicUsize::new(0),
                start_calls: AtomicUsize::new(0),
                fail_create_with: None,
            })
        }

        fn failing_create(message: &str) -> Arc<Self> {
            Arc::new(Self {
                state: StdMutex::new(ContainerState::Absent),
                create_calls: AtomicUsize::new(0),
                start_calls: AtomicUsize::new(0),
                fail_create_with: Some(message.to_string()),
            })
        }
    }

    #[async_trait]
    impl ContainerRuntime for MockRuntime {
        async fn ping(&self) -> bool {
            true
        }

        async fn image_present(&self, _image: &str) -> Result<bool, BrokerError> {
            Ok(true)
        }

        async fn container_state(&self, _name: &str) -> Result<ContainerState, BrokerError> {
            Ok(*self.state.lock().unwrap())
        }

        async fn create_container(&self, _name: &str, _image: &str) -> Result<(), BrokerError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(msg) = &self.fail_create_with {
                return Err(BrokerError::ContainerLifecycle(msg.clone()));
            }
            *self.state.lock().unwrap() = ContainerState::Stopped;
            Ok(())
        }

        async fn start_container(&self, _name: &str) -> Result<(), BrokerError> {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            *self.state.lock().unwrap() = ContainerState::Running;
            Ok(())
        }
    }

    #[tokio::test]
    async fn absent_container_is_created_and_started() {
        let runtime = MockRuntime::with_state(ContainerState::Absent);
        let manager = SharedContainerManager::with_name(runtime.clone(), "test-toolbox");

        let container = manager.ensure_running("scout/toolbox:latest").await.unwrap();

        assert_eq!(container.name, "test-toolbox");
        assert_eq!(container.image, "scout/toolbox:latest");
        assert_eq!(container.state, ContainerState::Running);
        assert_eq!(runtime.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(runtime.start_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stopped_container_is_started_not_recreated() {
        let runtime = MockRuntime::with_state(ContainerState::Stopped);
        let manager = SharedContainerManager::with_name(runtime.clone(), "test-toolbox");

        let container = manager.ensure_running("scout/toolbox:latest").await.unwrap();

        assert_eq!(container.state, ContainerState::Running);
        assert_eq!(runtime.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(runtime.start_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn running_container_is_a_noop() {
        let runtime = MockRuntime::with_state(ContainerState::Running);
        let manager = SharedContainerManager::with_name(runtime.clone(), "test-toolbox");

        let container = manager.ensure_running("scout/toolbox:latest").await.unwrap();

        assert_eq!(container.state, ContainerState::Running);
        assert_eq!(runtime.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(runtime.start_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_ensure_running_creates_exactly_once() {
        let runtime = MockRuntime::with_state(ContainerState::Absent);
        let manager = Arc::new(SharedContainerManager::with_name(
            runtime.clone(),
            "test-toolbox",
        ));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let m = Arc::clone(&manager);
            handles.push(tokio::spawn(async move {
                m.ensure_running("scout/toolbox:latest").await
            }));
        }

        for handle in handles {
            let container = handle.await.unwrap().unwrap();
            assert_eq!(container.state, ContainerState::Running);
        }

        assert_eq!(
            runtime.create_calls.load(Ordering::SeqCst),
            1,
            "creation must happen exactly once"
        );
    }

    #[tokio::test]
    async fn lost_name_race_counts_as_success() {
        // Another broker process created the container between our state
        // query and our create call.
        let runtime = MockRuntime::failing_create(
            "Conflict. The container name \"/test-toolbox\" is already in use",
        );
        let manager = SharedContainerManager::with_name(runtime.clone(), "test-toolbox");

        let container = manager.ensure_running("scout/toolbox:latest").await.unwrap();

        assert_eq!(container.state, ContainerState::Running);
        assert_eq!(runtime.start_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn genuine_create_failure_is_surfaced_without_retry() {
        let runtime = MockRuntime::failing_create("no space left on device");
        let manager = SharedContainerManager::with_name(runtime.clone(), "test-toolbox");

        let err = manager
            .ensure_running("scout/toolbox:latest")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("no space left on device"));
        assert_eq!(
            runtime.create_calls.load(Ordering::SeqCst),
            1,
            "must not retry a failed create"
        );
    }
}
