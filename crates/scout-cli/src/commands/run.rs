//! `scout run <tool> [args...]` -- invoke one tool and print the envelope.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use scout_broker::{Broker, DockerCli, InvocationRequest};

pub async fn run(
    tool: String,
    args: Vec<String>,
    timeout_secs: Option<u64>,
    workspace: Option<PathBuf>,
) -> Result<()> {
    let broker = Broker::new(Arc::new(DockerCli::default()));

    let mut request = InvocationRequest::new(tool, args);
    if let Some(secs) = timeout_secs {
        request = request.timeout(Duration::from_secs(secs));
    }
    if let Some(dir) = workspace {
        request = request.workspace(dir);
    }

    tracing::debug!(tool = %request.tool, args = ?request.args, "invoking broker");
    let result = broker.invoke(request).await;
    tracing::debug!(
        status = ?result.status,
        duration_ms = result.duration_ms,
        "invocation finished"
    );
    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.is_error() {
        std::process::exit(1);
    }
    Ok(())
}
