//! Command executor: runs a resolved plan under a hard deadline.
//!
//! All three modes funnel into one host process spawn: ephemeral runs and
//! shared-container execs are `docker run --rm ...` / `docker exec ...`
//! command lines, host processes are the plan argv itself. stdout and
//! stderr are captured independently into bounded buffers; on timeout or
//! cancellation the process is killed and whatever output was collected up
//! to that point is still returned.
//!
//! Killing the spawned client is not enough for the container modes: the
//! real work runs behind the runtime daemon and outlives a dead `docker
//! run`/`docker exec` client. Each plan therefore carries a kill route back
//! into the runtime -- ephemeral containers get a generated `--name` so the
//! deadline can `docker kill` them, and shared-container execs run under a
//! pid-tracing shell wrapper so the deadline can kill the exec'd process
//! inside the container.

use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use scout_types::{BrokerError, ExecMode, ExecutionPlan};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use crate::runtime::{validate_image_ref, validate_workspace_path};

/// Marker appended to captured output when the capture bound was hit or a
/// stream was cut short by a deadline kill.
pub const TRUNCATION_MARKER: &str = "\n[output truncated]";

/// How long to wait, after a kill, for the pipe readers to see EOF.
/// Orphaned descendants of the killed child can hold the write ends open
/// indefinitely; past this grace the captured prefix is returned as-is.
const READER_GRACE: Duration = Duration::from_millis(100);

/// Bound on the runtime-level kill command itself, so a wedged daemon
/// cannot stall the deadline path.
const REMOTE_KILL_WAIT: Duration = Duration::from_secs(2);

static RUN_SEQ: AtomicU64 = AtomicU64::new(0);

/// Executor tuning knobs.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Per-stream capture bound; excess bytes are dropped and the result is
    /// flagged as truncated.
    pub max_capture_bytes: usize,
    /// Binary used to reach the container runtime for the two container
    /// modes. Tests point this at a stand-in to avoid needing a daemon.
    pub docker_bin: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_capture_bytes: 1024 * 1024, // 1 MiB per stream
            docker_bin: "docker".to_string(),
        }
    }
}

/// Raw outcome of one process run, before policy classification.
#[derive(Debug)]
pub struct RawExecution {
    pub stdout: String,
    pub stderr: String,
    /// Absent when the process was killed or terminated by a signal.
    pub exit_code: Option<i32>,
    /// True when the deadline (timeout or cancellation) killed the process.
    pub killed: bool,
    pub duration: Duration,
    /// True when either stream exceeded the capture bound or was cut short
    /// by a deadline kill.
    pub truncated: bool,
}

/// How to terminate the actual work when the deadline fires, over and above
/// killing the spawned client process.
enum KillPlan {
    /// The child is the work; killing it is enough.
    Host,
    /// `docker kill` the named one-shot container.
    Ephemeral { name: String },
    /// Kill the exec'd process inside the shared container via the pid
    /// file written by the exec wrapper.
    SharedExec { container: String, pid_file: String },
}

/// Spawns and supervises the actual child processes.
pub struct CommandExecutor {
    config: ExecutorConfig,
}

impl CommandExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Run the plan to completion or deadline.
    ///
    /// `workspace` is passed through to the execution environment unchanged:
    /// a volume mount for ephemeral containers, the working directory for
    /// shared-container execs and host processes. Cancellation via `cancel`
    /// is honored identically to the timeout.
    pub async fn run(
        &self,
        plan: &ExecutionPlan,
        workspace: Option<&Path>,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<RawExecution, BrokerError> {
        let (host_argv, kill_plan) = self.host_argv(plan, workspace)?;
        tracing::debug!(mode = %plan.mode, command = %host_argv.join(" "), "spawning");

        let mut cmd = tokio::process::Command::new(&host_argv[0]);
        cmd.args(&host_argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if plan.mode == ExecMode::HostProcess {
            if let Some(dir) = workspace {
                cmd.current_dir(dir);
            }
        }

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|e| BrokerError::SpawnFailed {
            command: host_argv[0].clone(),
            message: e.to_string(),
        })?;

        let stdout_pipe = child.stdout.take().ok_or_else(|| BrokerError::SpawnFailed {
            command: host_argv[0].clone(),
            message: "stdout pipe missing".into(),
        })?;
        let stderr_pipe = child.stderr.take().ok_or_else(|| BrokerError::SpawnFailed {
            command: host_argv[0].clone(),
            message: "stderr pipe missing".into(),
        })?;

        let cap = self.config.max_capture_bytes;
        let (stdout_task, stdout_buf) = spawn_reader(stdout_pipe, cap);
        let (stderr_task, stderr_buf) = spawn_reader(stderr_pipe, cap);

        enum Waited {
            Exited(std::process::ExitStatus),
            TimedOut,
            Cancelled,
        }

        let waited = tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|e| BrokerError::SpawnFailed {
                    command: host_argv[0].clone(),
                    message: format!("wait failed: {e}"),
                })?;
                Waited::Exited(status)
            }
            _ = tokio::time::sleep(timeout) => Waited::TimedOut,
            _ = cancel.cancelled() => Waited::Cancelled,
        };

        let (exit_code, killed, duration) = match waited {
            Waited::Exited(status) => (status.code(), false, start.elapsed()),
            Waited::TimedOut => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                self.kill_remote(&kill_plan).await;
                tracing::warn!(command = %host_argv[0], timeout_ms = timeout.as_millis() as u64,
                    "process exceeded its deadline and was killed");
                (None, true, timeout)
            }
            Waited::Cancelled => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                self.kill_remote(&kill_plan).await;
                tracing::info!(command = %host_argv[0], "process cancelled by caller");
                (None, true, start.elapsed())
            }
        };

        let (stdout, stdout_truncated) = collect_stream(stdout_task, stdout_buf, killed).await;
        let (stderr, stderr_truncated) = collect_stream(stderr_task, stderr_buf, killed).await;

        Ok(RawExecution {
            stdout,
            stderr,
            exit_code,
            killed,
            duration,
            truncated: stdout_truncated || stderr_truncated,
        })
    }

    /// The concrete host command line for a plan, paired with the route for
    /// terminating the work if the deadline fires.
    fn host_argv(
        &self,
        plan: &ExecutionPlan,
        workspace: Option<&Path>,
    ) -> Result<(Vec<String>, KillPlan), BrokerError> {
        let workspace = workspace.map(|p| p.display().to_string());
        if let Some(ws) = &workspace {
            validate_workspace_path(ws)?;
        }

        match plan.mode {
            ExecMode::EphemeralImage => {
                validate_image_ref(&plan.reference)?;
                let name = ephemeral_run_name();
                let mut argv = vec![self.config.docker_bin.clone()];
                argv.extend(build_run_args(
                    &plan.reference,
                    &plan.argv,
                    workspace.as_deref(),
                    &name,
                ));
                Ok((argv, KillPlan::Ephemeral { name }))
            }
            ExecMode::SharedContainerExec => {
                let pid_file = exec_pid_file();
                let mut argv = vec![self.config.docker_bin.clone()];
                argv.extend(build_exec_args(
                    &plan.reference,
                    &plan.argv,
                    workspace.as_deref(),
                    &pid_file,
                ));
                Ok((
                    argv,
                    KillPlan::SharedExec {
                        container: plan.reference.clone(),
                        pid_file,
                    },
                ))
            }
            ExecMode::HostProcess => Ok((plan.argv.clone(), KillPlan::Host)),
        }
    }

    /// Terminate the daemon-side work a dead client leaves behind.
    ///
    /// Failures are logged, not surfaced: the work may have finished on its
    /// own (an ephemeral container is auto-removed the moment it exits),
    /// and the caller's error is the timeout itself.
    async fn kill_remote(&self, plan: &KillPlan) {
        let args = match plan {
            KillPlan::Host => return,
            KillPlan::Ephemeral { name } => build_ephemeral_kill_args(name),
            KillPlan::SharedExec {
                container,
                pid_file,
            } => build_shared_kill_args(container, pid_file),
        };

        let kill = tokio::process::Command::new(&self.config.docker_bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match tokio::time::timeout(REMOTE_KILL_WAIT, kill).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "runtime-level kill could not be issued");
            }
            Err(_) => {
                tracing::warn!("runtime-level kill did not return in time");
            }
        }
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}

/// Unique container name for one ephemeral run, so the deadline kill can
/// target it through the runtime.
fn ephemeral_run_name() -> String {
    format!(
        "scout-run-{}-{}",
        std::process::id(),
        RUN_SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

/// Unique pid-file path (inside the shared container) for one exec.
fn exec_pid_file() -> String {
    format!(
        "/tmp/scout-exec-{}-{}.pid",
        std::process::id(),
        RUN_SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

/// Arguments for a one-shot, auto-removing container run.
///
/// The explicit `--entrypoint` pins the command to the tool binary: the
/// vendor images in the builtin table already declare the tool as their
/// entrypoint, and appending the full argv as CMD would hand the tool its
/// own name as the first argument.
///
/// Exposed so tests can inspect the constructed command without a daemon.
pub fn build_run_args(
    image: &str,
    argv: &[String],
    workspace: Option<&str>,
    name: &str,
) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "--rm".to_string(),
        "--name".to_string(),
        name.to_string(),
    ];
    if let Some(ws) = workspace {
        args.push("-v".to_string());
        args.push(format!("{ws}:/workspace"));
        args.push("-w".to_string());
        args.push("/workspace".to_string());
    }
    if let Some((tool, rest)) = argv.split_first() {
        args.push("--entrypoint".to_string());
        args.push(tool.clone());
        args.push(image.to_string());
        args.extend_from_slice(rest);
    } else {
        args.push(image.to_string());
    }
    args
}

/// Arguments for an exec inside the running shared container.
///
/// The argv runs under a small shell wrapper that records its pid in
/// `pid_file` before exec'ing the tool, so a deadline kill can reach the
/// exec'd process. The workspace, when given, is the working directory as
/// visible inside the container; mounts are fixed at container creation and
/// cannot be added per exec.
pub fn build_exec_args(
    container: &str,
    argv: &[String],
    workspace: Option<&str>,
    pid_file: &str,
) -> Vec<String> {
    let mut args = vec!["exec".to_string()];
    if let Some(ws) = workspace {
        args.push("-w".to_string());
        args.push(ws.to_string());
    }
    args.push(container.to_string());
    args.push("sh".to_string());
    args.push("-c".to_string());
    args.push(format!("echo $$ > {pid_file}; exec \"$0\" \"$@\""));
    args.extend_from_slice(argv);
    args
}

/// Kill command for a named ephemeral container.
pub fn build_ephemeral_kill_args(name: &str) -> Vec<String> {
    vec!["kill".to_string(), name.to_string()]
}

/// Kill command for an exec'd process inside the shared container.
pub fn build_shared_kill_args(container: &str, pid_file: &str) -> Vec<String> {
    vec![
        "exec".to_string(),
        container.to_string(),
        "sh".to_string(),
        "-c".to_string(),
        format!("kill -9 $(cat {pid_file}) 2>/dev/null; rm -f {pid_file}"),
    ]
}

/// Drain a pipe into a shared bounded buffer.
///
/// The buffer is shared so the captured prefix stays reachable even when
/// the reader has to be abandoned (see [`collect_stream`]). Reading
/// continues past the cap so the child never blocks on a full pipe; the
/// excess is dropped and the stream flagged as truncated.
fn spawn_reader<R>(
    mut reader: R,
    cap: usize,
) -> (tokio::task::JoinHandle<bool>, Arc<Mutex<Vec<u8>>>)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    let buf = Arc::new(Mutex::new(Vec::with_capacity(8192.min(cap))));
    let shared = Arc::clone(&buf);

    let handle = tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        let mut truncated = false;
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => {
                    let mut buf = lock_buf(&shared);
                    if buf.len() < cap {
                        let take = n.min(cap - buf.len());
                        buf.extend_from_slice(&chunk[..take]);
                        if take < n {
                            truncated = true;
                        }
                    } else {
                        truncated = true;
                    }
                }
                Err(_) => break,
            }
        }
        truncated
    });

    (handle, buf)
}

/// Finish one captured stream.
///
/// After a normal exit the reader is awaited to EOF. After a kill it is
/// raced against a short grace deadline instead: orphaned descendants of
/// the killed child that inherited the pipe keep the write end open, and
/// waiting them out would stall the deadline indefinitely. Past the grace
/// the reader is abandoned and the captured prefix returned, flagged as
/// truncated.
async fn collect_stream(
    mut task: tokio::task::JoinHandle<bool>,
    buf: Arc<Mutex<Vec<u8>>>,
    killed: bool,
) -> (String, bool) {
    let truncated = if killed {
        match tokio::time::timeout(READER_GRACE, &mut task).await {
            Ok(res) => res.unwrap_or(false),
            Err(_) => {
                task.abort();
                true
            }
        }
    } else {
        task.await.unwrap_or(false)
    };

    let data = lock_buf(&buf).clone();
    let mut text = String::from_utf8_lossy(&data).into_owned();
    if truncated {
        text.push_str(TRUNCATION_MARKER);
    }
    (text, truncated)
}

/// Lock a capture buffer, recovering the data if a reader panicked.
fn lock_buf(buf: &Mutex<Vec<u8>>) -> std::sync::MutexGuard<'_, Vec<u8>> {
    match buf.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
