//! Execution host: controller for one editor session's sandboxed runs.
//!
//! The host owns the single live worker, the monotonic execution-id counter,
//! the timeout supervisor, and the session transcript. All mutable state lives
//! inside one event-loop task; the public `ExecutionHost` handle is a cheap
//! clone that talks to the loop over a channel, so `submit` and `stop` return
//! as soon as the loop has acted and never wait for execution itself.
//!
//! Correctness hinges on one rule: a result is acted upon only when its
//! request id equals the id currently in flight. Destructive termination
//! (timeout, user stop, crash) clears the in-flight id before anything else
//! advances, so a late result from a killed worker can never match. Worker
//! lifecycle events carry the identity of the worker that produced them and
//! are dropped when that worker has been superseded.

mod supervisor;


use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

use crate::config::RunnerConfig;
use crate::core_types::{
    ExecutionRequest, ExecutionResult, HostSnapshot, SessionContext, WorkerState,
};
use crate::errors::RunnerError;
use crate::reporter::{InteractionRecord, ResultReporter};
use crate::sandbox::{EventSink, Sandbox, TaggedWorkerEvent, WorkerEvent, WorkerHandle, WorkerId};
use crate::transcript::Transcript;
use supervisor::TimeoutSupervisor;

/// Outcome of a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted { request_id: u64 },
    /// Work is only forwarded to a Ready worker; nothing is queued.
    NotReady { state: WorkerState },
}

/// Outcome of a stop or restart request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    Ack,
    NoOp,
}

enum HostCommand {
    Submit {
        source: String,
        reply: oneshot::Sender<SubmitOutcome>,
    },
    Stop {
        reply: oneshot::Sender<ControlOutcome>,
    },
    Restart {
        reply: oneshot::Sender<ControlOutcome>,
    },
}

/// Cloneable handle to a running execution host.
#[derive(Clone)]
pub struct ExecutionHost {
    commands: mpsc::UnboundedSender<HostCommand>,
    updates: watch::Receiver<HostSnapshot>,
}

impl ExecutionHost {
    /// Starts the host loop and the first worker. Requires a tokio runtime.
    pub fn spawn(
        sandbox: Arc<dyn Sandbox>,
        reporter: Arc<dyn ResultReporter>,
        session: SessionContext,
        config: RunnerConfig,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (worker_events_tx, worker_events_rx) = mpsc::unbounded_channel();
        let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = watch::channel(HostSnapshot::initial());

        let host_loop = HostLoop {
            sandbox,
            reporter,
            session,
            state: WorkerState::Uninitialized,
            next_id: 0,
            inflight: None,
            worker: None,
            current_worker: None,
            transcript: Transcript::new(),
            last_result: None,
            supervisor: TimeoutSupervisor::new(config.timeout(), expiry_tx),
            worker_events_tx,
            updates: updates_tx,
        };
        tokio::spawn(host_loop.run(commands_rx, worker_events_rx, expiry_rx));

        Self {
            commands: commands_tx,
            updates: updates_rx,
        }
    }

    pub async fn submit(&self, source: impl Into<String>) -> Result<SubmitOutcome, RunnerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(HostCommand::Submit {
                source: source.into(),
                reply: reply_tx,
            })
            .map_err(|_| host_gone())?;
        reply_rx.await.map_err(|_| host_gone())
    }

    pub async fn stop(&self) -> Result<ControlOutcome, RunnerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(HostCommand::Stop { reply: reply_tx })
            .map_err(|_| host_gone())?;
        reply_rx.await.map_err(|_| host_gone())
    }

    /// External retry after a fatal initialization failure.
    pub async fn restart(&self) -> Result<ControlOutcome, RunnerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(HostCommand::Restart { reply: reply_tx })
            .map_err(|_| host_gone())?;
        reply_rx.await.map_err(|_| host_gone())
    }

    /// Subscription to `{state, lines, last_result}` updates.
    pub fn subscribe(&self) -> watch::Receiver<HostSnapshot> {
        self.updates.clone()
    }

    pub fn snapshot(&self) -> HostSnapshot {
        self.updates.borrow().clone()
    }
}

fn host_gone() -> RunnerError {
    RunnerError::HostUnavailable("execution host task has shut down".to_string())
}

struct HostLoop {
    sandbox: Arc<dyn Sandbox>,
    reporter: Arc<dyn ResultReporter>,
    session: SessionContext,
    state: WorkerState,
    next_id: u64,
    inflight: Option<ExecutionRequest>,
    worker: Option<Box<dyn WorkerHandle>>,
    current_worker: Option<WorkerId>,
    transcript: Transcript,
    last_result: Option<ExecutionResult>,
    supervisor: TimeoutSupervisor,
    worker_events_tx: mpsc::UnboundedSender<TaggedWorkerEvent>,
    updates: watch::Sender<HostSnapshot>,
}

impl HostLoop {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<HostCommand>,
        mut worker_events: mpsc::UnboundedReceiver<TaggedWorkerEvent>,
        mut expiries: mpsc::UnboundedReceiver<u64>,
    ) {
        self.spawn_worker().await;
        self.publish();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.on_command(command).await,
                    // every handle dropped; wind down
                    None => break,
                },
                Some(event) = worker_events.recv() => self.on_worker_event(event).await,
                Some(request_id) = expiries.recv() => self.on_timeout(request_id).await,
            }
            self.publish();
        }

        if let Some(mut worker) = self.worker.take() {
            worker.terminate().await;
        }
    }

    async fn on_command(&mut self, command: HostCommand) {
        match command {
            HostCommand::Submit { source, reply } => {
                let outcome = self.on_submit(source).await;
                let _ = reply.send(outcome);
            }
            HostCommand::Stop { reply } => {
                let outcome = self.on_stop().await;
                let _ = reply.send(outcome);
            }
            HostCommand::Restart { reply } => {
                let outcome = self.on_restart().await;
                let _ = reply.send(outcome);
            }
        }
    }

    async fn on_submit(&mut self, source: String) -> SubmitOutcome {
        if self.state != WorkerState::Ready {
            log::debug!("rejecting submission while {:?}", self.state);
            return SubmitOutcome::NotReady { state: self.state };
        }
        let Some(worker) = self.worker.as_mut() else {
            log::error!("state is Ready but no worker handle is live");
            return SubmitOutcome::NotReady { state: self.state };
        };

        self.next_id += 1;
        let request = ExecutionRequest::new(self.next_id, source);
        let request_id = request.id;

        self.state = WorkerState::Busy;
        self.transcript.append("Running code...");
        self.inflight = Some(request.clone());

        match worker.dispatch(&request).await {
            Ok(()) => {
                self.supervisor.arm(request_id);
                log::info!("dispatched request {} to worker", request_id);
            }
            Err(e) => {
                log::error!("dispatch of request {} failed: {}", request_id, e);
                self.recover_from_crash(format!("dispatch failed: {}", e))
                    .await;
            }
        }

        SubmitOutcome::Accepted { request_id }
    }

    async fn on_stop(&mut self) -> ControlOutcome {
        if self.state != WorkerState::Busy {
            return ControlOutcome::NoOp;
        }
        let Some(request) = self.inflight.take() else {
            log::error!("busy with no request in flight, recovering anyway");
            self.destroy_and_respawn("✗ Execution stopped by user").await;
            return ControlOutcome::Ack;
        };
        log::info!("stopping request {} at user request", request.id);
        self.supervisor.disarm(request.id);
        self.destroy_and_respawn("✗ Execution stopped by user").await;
        let result = failure_result(request.id, "Execution stopped by user");
        self.last_result = Some(result.clone());
        self.report(request, result);
        ControlOutcome::Ack
    }

    async fn on_restart(&mut self) -> ControlOutcome {
        if self.state != WorkerState::Terminated {
            return ControlOutcome::NoOp;
        }
        log::info!("restarting sandbox after fatal initialization failure");
        self.spawn_worker().await;
        ControlOutcome::Ack
    }

    async fn on_timeout(&mut self, request_id: u64) {
        let expired = self.state == WorkerState::Busy
            && self.inflight.as_ref().map(|r| r.id) == Some(request_id);
        if !expired {
            log::debug!("ignoring expired timer for request {}", request_id);
            return;
        }
        let Some(request) = self.inflight.take() else {
            return;
        };
        log::warn!(
            "request {} exceeded its time budget, terminating worker",
            request_id
        );
        self.destroy_and_respawn("✗ Execution timed out").await;
        let result = failure_result(request.id, "Execution timed out");
        self.last_result = Some(result.clone());
        self.report(request, result);
    }

    async fn on_worker_event(&mut self, event: TaggedWorkerEvent) {
        if Some(event.worker_id) != self.current_worker {
            log::debug!("discarding event from superseded worker {}", event.worker_id);
            return;
        }
        match event.event {
            WorkerEvent::Ready => self.on_worker_ready(event.worker_id),
            WorkerEvent::InitError(message) => self.fail_initialization(message),
            WorkerEvent::Log(text) => {
                self.transcript.append(text);
            }
            WorkerEvent::Result(result) => self.on_result(result),
            WorkerEvent::Crashed(message) => self.recover_from_crash(message).await,
        }
    }

    fn on_worker_ready(&mut self, worker_id: WorkerId) {
        if self.state != WorkerState::Initializing {
            log::debug!("ready signal in state {:?}, ignoring", self.state);
            return;
        }
        self.state = WorkerState::Ready;
        self.transcript.append("✓ Sandbox ready");
        log::info!("worker {} is ready", worker_id);
    }

    fn fail_initialization(&mut self, message: String) {
        log::error!("sandbox initialization failed: {}", message);
        self.state = WorkerState::Terminated;
        self.worker = None;
        self.transcript
            .append(format!("✗ Sandbox failed to start: {}", message));
    }

    fn on_result(&mut self, result: ExecutionResult) {
        // The id check is the sole gate for acting on a result.
        let in_flight_id = self.inflight.as_ref().map(|r| r.id);
        if in_flight_id != Some(result.request_id) {
            log::debug!(
                "discarding result for request {} (in flight: {:?})",
                result.request_id,
                in_flight_id
            );
            return;
        }
        let Some(request) = self.inflight.take() else {
            return;
        };
        self.supervisor.disarm(result.request_id);

        if result.success {
            if result.output.trim().is_empty() {
                self.transcript.append("(no output)");
            } else {
                for line in result.output.lines() {
                    self.transcript.append(line);
                }
            }
        } else {
            let message = result
                .error_message
                .as_deref()
                .unwrap_or("Execution failed");
            self.transcript.append(format!("✗ {}", message));
        }

        self.state = WorkerState::Ready;
        self.last_result = Some(result.clone());
        log::info!(
            "request {} finished (success={})",
            result.request_id,
            result.success
        );
        self.report(request, result);
    }

    async fn recover_from_crash(&mut self, reason: String) {
        log::warn!("worker failure: {}", reason);
        let interrupted = self.inflight.take();
        if let Some(request) = &interrupted {
            self.supervisor.disarm(request.id);
        }
        self.destroy_and_respawn("✗ Sandbox exited unexpectedly").await;
        if let Some(request) = interrupted {
            let result = failure_result(request.id, "Sandbox exited unexpectedly");
            self.last_result = Some(result.clone());
            self.report(request, result);
        }
    }

    /// The one destructive-termination sequence: kill, log, pass through
    /// `Uninitialized`, and respawn immediately.
    async fn destroy_and_respawn(&mut self, line: &str) {
        if let Some(mut worker) = self.worker.take() {
            worker.terminate().await;
        }
        self.transcript.append(line);
        self.state = WorkerState::Uninitialized;
        self.spawn_worker().await;
    }

    async fn spawn_worker(&mut self) {
        let worker_id = WorkerId::new();
        self.current_worker = Some(worker_id);
        self.state = WorkerState::Initializing;
        let sink = EventSink::new(worker_id, self.worker_events_tx.clone());
        match self.sandbox.spawn(sink).await {
            Ok(handle) => {
                self.worker = Some(handle);
            }
            Err(e) => self.fail_initialization(e.to_string()),
        }
    }

    /// Reporter hooks run on detached tasks so a slow collaborator can never
    /// stall the loop; their failures are logged and ignored.
    fn report(&self, request: ExecutionRequest, result: ExecutionResult) {
        let reporter = Arc::clone(&self.reporter);
        let ctx = self.session.clone();
        tokio::spawn(async move {
            let success = result.success;
            let output = if success {
                result.output
            } else {
                result.error_message.unwrap_or_default()
            };
            let record = InteractionRecord {
                source: request.source,
                output,
                success,
            };
            if let Err(e) = reporter.persist_interaction(&ctx, record).await {
                log::warn!("failed to persist interaction: {}", e);
            }
            if success {
                if let Err(e) = reporter.on_successful_execution(&ctx).await {
                    log::warn!("reward hook failed: {}", e);
                }
            }
        });
    }

    fn publish(&self) {
        let _ = self.updates.send(HostSnapshot {
            state: self.state,
            lines: self.transcript.lines().to_vec(),
            last_result: self.last_result.clone(),
        });
    }
}

fn failure_result(request_id: u64, message: &str) -> ExecutionResult {
    ExecutionResult {
        request_id,
        output: String::new(),
        success: false,
        error_message: Some(message.to_string()),
    }
}
