//! Execution broker for agent-callable external tools.
//!
//! The broker decides how a named tool actually runs -- a vendor-published
//! ephemeral image, an exec inside the locally built shared container, or a
//! binary already on the host -- manages the shared container's lifecycle,
//! executes the command under a deadline with bounded output capture, and
//! returns a normalized [`scout_types::ExecutionResult`] regardless of which
//! path was used.
//!
//! Components, leaves first:
//! - [`registry`]: static tool-name -> [`scout_types::ToolSpec`] table
//! - [`runtime`]: the container-runtime control boundary
//! - [`probe`]: per-call resolution of the concrete execution path
//! - [`lifecycle`]: create/start/reuse of the single shared container
//! - [`executor`]: process spawning, capture, timeout, and cancellation
//! - [`normalize`]: exit-code policy application and error classification
//! - [`broker`]: the facade tying the above together

pub mod broker;
pub mod executor;
pub mod lifecycle;
pub mod normalize;
pub mod probe;
pub mod registry;
pub mod runtime;

pub use broker::{Broker, InvocationRequest};
pub use executor::{CommandExecutor, ExecutorConfig, RawExecution};
pub use lifecycle::{SharedContainer, SharedContainerManager, SHARED_CONTAINER_NAME};
pub use normalize::normalize;
pub use probe::{BinaryLocator, EnvironmentProbe, PathLocator};
pub use registry::ToolRegistry;
pub use runtime::{ContainerRuntime, ContainerState, DockerCli};

pub use tokio_util::sync::CancellationToken;
