//! End-to-end check of the public API and the JSON envelope a caller sees.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scout_broker::{
    BinaryLocator, Broker, ContainerRuntime, ContainerState, ExecutorConfig, InvocationRequest,
    ToolRegistry,
};
use scout_types::{BrokerError, ToolSpec};

struct DownRuntime;

#[async_trait]
impl ContainerRuntime for DownRuntime {
    async fn ping(&self) -> bool {
        false
    }

    async fn image_present(&self, _image: &str) -> Result<bool, BrokerError> {
        Ok(false)
    }

    async fn container_state(&self, _name: &str) -> Result<ContainerState, BrokerError> {
        Ok(ContainerState::Absent)
    }

    async fn create_container(&self, _name: &str, _image: &str) -> Result<(), BrokerError> {
        Err(BrokerError::ContainerLifecycle("runtime down".into()))
    }

    async fn start_container(&self, _name: &str) -> Result<(), BrokerError> {
        Err(BrokerError::ContainerLifecycle("runtime down".into()))
    }
}

struct PathBinaries;

impl BinaryLocator for PathBinaries {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}

fn broker_with(spec: ToolSpec) -> Broker {
    let mut registry = ToolRegistry::new();
    registry.register(spec).unwrap();
    Broker::with_parts(
        registry,
        Arc::new(DownRuntime),
        Arc::new(PathBinaries),
        ExecutorConfig::default(),
    )
}

#[tokio::test]
async fn successful_run_serializes_the_stable_envelope() {
    let broker = broker_with(ToolSpec::new("echo").host_only());

    let result = broker
        .invoke(InvocationRequest::new("echo", vec!["hello".to_string()]))
        .await;

    let json: serde_json::Value = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["outcome_class"], "ok_with_data");
    assert_eq!(json["mode"], "host_process");
    assert_eq!(json["exit_code"], 0);
    assert!(json["error"].is_null());
    assert!(json["duration_ms"].is_u64());
    assert_eq!(json["output_truncated"], false);
    assert!(json["stdout"].as_str().unwrap().contains("hello"));
}

#[tokio::test]
async fn timeout_envelope_preserves_partial_output() {
    let broker = broker_with(ToolSpec::new("sh").host_only());

    let result = broker
        .invoke(
            InvocationRequest::new(
                "sh",
                vec!["-c".to_string(), "echo early; sleep 30".to_string()],
            )
            .timeout(Duration::from_millis(200)),
        )
        .await;

    let json: serde_json::Value = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"]["kind"], "timeout");
    assert!(json["exit_code"].is_null());
    assert!(json["stdout"].as_str().unwrap().contains("early"));
}

#[tokio::test]
async fn unresolvable_tool_reports_remediation_hints() {
    let broker = broker_with(ToolSpec::new("definitely-not-installed-anywhere"));

    let result = broker
        .invoke(InvocationRequest::new(
            "definitely-not-installed-anywhere",
            vec![],
        ))
        .await;

    let json: serde_json::Value = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"]["kind"], "no_execution_path");
    let message = json["error"]["message"].as_str().unwrap();
    assert!(message.contains("runtime unreachable") || message.contains("binary"));
}
