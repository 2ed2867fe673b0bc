//! Process-backed sandbox running lesson code under a CPython interpreter.
//!
//! Each worker is its own OS process launched in isolated mode (`-I`), with a
//! small driver script materialized into a private temp directory. Requests
//! travel to the driver as JSON lines on stdin; replies and the startup
//! handshake come back on stdout; the driver's own stderr is drained into the
//! log for diagnosis and never reaches the transcript. Killing the process is
//! the only termination path — the interpreter is never asked to stop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::process::Stdio;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use uuid::Uuid;
use which::which;

use super::{EventSink, Sandbox, WorkerEvent, WorkerHandle};
use crate::config::RunnerConfig;
use crate::core_types::{ExecutionRequest, ExecutionResult};
use crate::errors::SandboxError;
use crate::{packages, traceback};

const DRIVER_SOURCE: &str = include_str!("driver.py");

/// Request frame handed to the driver.
#[derive(Debug, Serialize)]
struct DriverRequest<'a> {
    id: u64,
    source: &'a str,
    packages: Vec<String>,
}

/// Reply frame from the driver.
#[derive(Debug, Deserialize)]
struct DriverReply {
    id: u64,
    ok: bool,
    #[serde(default)]
    output: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DriverHandshake {
    event: String,
}

pub struct PythonSandbox {
    binary: String,
    args: Vec<String>,
    allowed_packages: Vec<String>,
}

impl PythonSandbox {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            binary: config.interpreter.binary.clone(),
            args: config.interpreter.args.clone(),
            allowed_packages: config.allowed_packages.clone(),
        }
    }
}

#[async_trait]
impl Sandbox for PythonSandbox {
    async fn spawn(&self, events: EventSink) -> Result<Box<dyn WorkerHandle>, SandboxError> {
        let interpreter = which(&self.binary)
            .map_err(|_| SandboxError::InterpreterNotFound(self.binary.clone()))?;

        let driver_dir = tempfile::Builder::new()
            .prefix("praxis-worker-")
            .tempdir()
            .map_err(|e| SandboxError::DriverScript(e.to_string()))?;
        let driver_path = driver_dir
            .path()
            .join(format!("driver_{}.py", Uuid::new_v4()));
        tokio::fs::write(&driver_path, DRIVER_SOURCE).await?;

        let mut child = Command::new(interpreter)
            .arg("-I")
            .args(&self.args)
            .arg(&driver_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().ok_or(SandboxError::MissingStreams)?;
        let stdout = child.stdout.take().ok_or(SandboxError::MissingStreams)?;
        let stderr = child.stderr.take().ok_or(SandboxError::MissingStreams)?;

        tokio::spawn(drain_stderr(stderr, events.clone()));
        tokio::spawn(pump_replies(stdout, events.clone()));

        log::info!("spawned sandbox worker {}", events.worker_id());

        Ok(Box::new(PythonWorker {
            child,
            stdin,
            events,
            allowed_packages: self.allowed_packages.clone(),
            _driver_dir: driver_dir,
        }))
    }
}

struct PythonWorker {
    child: Child,
    stdin: ChildStdin,
    events: EventSink,
    allowed_packages: Vec<String>,
    _driver_dir: TempDir,
}

#[async_trait]
impl WorkerHandle for PythonWorker {
    async fn dispatch(&mut self, request: &ExecutionRequest) -> Result<(), SandboxError> {
        let required: BTreeSet<String> = packages::resolve(&request.source, &self.allowed_packages);
        if !required.is_empty() {
            let listing = required.iter().cloned().collect::<Vec<_>>().join(", ");
            self.events
                .post(WorkerEvent::Log(format!("📦 Loading packages: {}", listing)));
        }

        let frame = DriverRequest {
            id: request.id,
            source: &request.source,
            packages: required.into_iter().collect(),
        };
        let mut line = serde_json::to_string(&frame)?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn terminate(&mut self) {
        if let Err(e) = self.child.start_kill() {
            log::debug!(
                "kill for worker {} failed (already exited?): {}",
                self.events.worker_id(),
                e
            );
        }
        // Reap the process so the kill is complete before the host respawns.
        match self.child.wait().await {
            Ok(status) => log::info!(
                "terminated sandbox worker {} ({})",
                self.events.worker_id(),
                status
            ),
            Err(e) => log::warn!(
                "failed waiting on killed worker {}: {}",
                self.events.worker_id(),
                e
            ),
        }
    }
}

/// Reads the handshake, then converts driver replies into worker events until
/// the stream ends.
async fn pump_replies(stdout: ChildStdout, events: EventSink) {
    let mut lines = BufReader::new(stdout).lines();

    match lines.next_line().await {
        Ok(Some(line)) => match serde_json::from_str::<DriverHandshake>(&line) {
            Ok(handshake) if handshake.event == "ready" => events.post(WorkerEvent::Ready),
            _ => {
                events.post(WorkerEvent::InitError(format!(
                    "unexpected handshake from driver: {}",
                    line
                )));
                return;
            }
        },
        Ok(None) => {
            events.post(WorkerEvent::InitError(
                "interpreter exited before completing startup".to_string(),
            ));
            return;
        }
        Err(e) => {
            events.post(WorkerEvent::InitError(format!(
                "failed reading driver handshake: {}",
                e
            )));
            return;
        }
    }

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match serde_json::from_str::<DriverReply>(&line) {
                Ok(reply) => {
                    let result = ExecutionResult {
                        request_id: reply.id,
                        output: reply.output,
                        success: reply.ok,
                        error_message: reply.error.map(|raw| traceback::summarize(&raw)),
                    };
                    events.post(WorkerEvent::Result(result));
                }
                Err(e) => {
                    log::warn!(
                        "worker {} sent a malformed reply, skipping: {}",
                        events.worker_id(),
                        e
                    );
                }
            },
            Ok(None) => {
                events.post(WorkerEvent::Crashed(
                    "worker process closed its output stream".to_string(),
                ));
                return;
            }
            Err(e) => {
                events.post(WorkerEvent::Crashed(format!(
                    "error reading worker output: {}",
                    e
                )));
                return;
            }
        }
    }
}

async fn drain_stderr(stderr: ChildStderr, events: EventSink) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        log::warn!("worker {} stderr: {}", events.worker_id(), line);
    }
}
