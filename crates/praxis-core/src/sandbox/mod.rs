//! Isolated execution units for running untrusted lesson code.
//!
//! A sandbox is a factory for workers; a worker owns exactly one interpreter
//! instance and reports everything it does as events tagged with its own
//! identity. The host never calls into a worker synchronously for results —
//! it dispatches a request and consumes events, so a wedged interpreter can
//! never wedge the host. Termination is destructive by contract: there is no
//! cooperative cancellation channel to the interpreter, only a process kill.

use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core_types::{ExecutionRequest, ExecutionResult};
use crate::errors::SandboxError;

pub mod python;

pub use python::PythonSandbox;

/// Identity of one spawned worker. Events from a superseded worker are
/// discarded by the host on this alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(Uuid);

impl WorkerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorkerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Events a worker posts back to its host.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// The interpreter finished starting up and will accept requests.
    Ready,
    /// The interpreter could not start; the worker is dead on arrival.
    InitError(String),
    /// A transcript line produced outside captured program output, e.g.
    /// package loading progress.
    Log(String),
    /// Structured outcome for a dispatched request.
    Result(ExecutionResult),
    /// The worker process went away without being asked to.
    Crashed(String),
}

/// A worker event together with the identity of the worker that produced it.
#[derive(Debug, Clone)]
pub struct TaggedWorkerEvent {
    pub worker_id: WorkerId,
    pub event: WorkerEvent,
}

/// Sending side handed to each spawned worker; every event it posts carries
/// the worker's identity.
#[derive(Clone)]
pub struct EventSink {
    worker_id: WorkerId,
    tx: mpsc::UnboundedSender<TaggedWorkerEvent>,
}

impl EventSink {
    pub fn new(worker_id: WorkerId, tx: mpsc::UnboundedSender<TaggedWorkerEvent>) -> Self {
        Self { worker_id, tx }
    }

    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    pub fn post(&self, event: WorkerEvent) {
        if self
            .tx
            .send(TaggedWorkerEvent {
                worker_id: self.worker_id,
                event,
            })
            .is_err()
        {
            log::debug!("host is gone, dropping event from worker {}", self.worker_id);
        }
    }
}

/// Factory for isolated execution units.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Spawns a fresh worker. The worker posts `Ready` (or `InitError`)
    /// through `events` once startup settles; a fresh unit always initializes
    /// from scratch — nothing is shared across units.
    async fn spawn(&self, events: EventSink) -> Result<Box<dyn WorkerHandle>, SandboxError>;
}

/// Handle to one live worker, owned exclusively by the host.
#[async_trait]
pub trait WorkerHandle: Send {
    /// Forwards a request to the interpreter. Returns as soon as the request
    /// is handed off; the outcome arrives as a `WorkerEvent::Result`.
    async fn dispatch(&mut self, request: &ExecutionRequest) -> Result<(), SandboxError>;

    /// Destructive termination. Must not rely on the interpreter cooperating
    /// and must leave no result able to reach the host afterwards except
    /// through the id check.
    async fn terminate(&mut self);
}
