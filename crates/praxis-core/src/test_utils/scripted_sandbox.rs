//! Plan-driven sandbox fake.
//!
//! Each spawned worker follows the next `WorkerPlan` in line; tests can also
//! post arbitrary events through a captured `EventSink` to simulate stale,
//! duplicate, or crashed deliveries exactly when they want them.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::core_types::{ExecutionRequest, ExecutionResult};
use crate::errors::SandboxError;
use crate::sandbox::{EventSink, Sandbox, WorkerEvent, WorkerHandle};

/// How a scripted worker answers one dispatched request.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Success { delay: Duration, output: String },
    Failure { delay: Duration, error: String },
    /// Never answer; only the supervisor can end the run.
    Hang,
}

#[derive(Debug, Clone)]
pub enum InitBehavior {
    Ready,
    Fail(String),
}

/// Behavior of one spawned worker, consumed in spawn order.
#[derive(Debug, Clone)]
pub struct WorkerPlan {
    pub init: InitBehavior,
    pub replies: Vec<ScriptedReply>,
}

impl WorkerPlan {
    pub fn ready(replies: Vec<ScriptedReply>) -> Self {
        Self {
            init: InitBehavior::Ready,
            replies,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            init: InitBehavior::Fail(message.to_string()),
            replies: Vec::new(),
        }
    }
}

pub struct ScriptedSandbox {
    plans: Mutex<VecDeque<WorkerPlan>>,
    sinks: Mutex<Vec<EventSink>>,
    dispatches: Arc<Mutex<Vec<ExecutionRequest>>>,
    terminated: Arc<AtomicUsize>,
}

impl ScriptedSandbox {
    pub fn new(plans: Vec<WorkerPlan>) -> Self {
        Self {
            plans: Mutex::new(plans.into()),
            sinks: Mutex::new(Vec::new()),
            dispatches: Arc::new(Mutex::new(Vec::new())),
            terminated: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sink of the n-th spawned worker, in spawn order.
    pub fn sink(&self, index: usize) -> EventSink {
        self.sinks.lock().unwrap()[index].clone()
    }

    pub fn spawn_count(&self) -> usize {
        self.sinks.lock().unwrap().len()
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatches.lock().unwrap().len()
    }

    pub fn dispatched_ids(&self) -> Vec<u64> {
        self.dispatches.lock().unwrap().iter().map(|r| r.id).collect()
    }

    pub fn terminated_count(&self) -> usize {
        self.terminated.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sandbox for ScriptedSandbox {
    async fn spawn(&self, events: EventSink) -> Result<Box<dyn WorkerHandle>, SandboxError> {
        let plan = self
            .plans
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| WorkerPlan::ready(Vec::new()));
        self.sinks.lock().unwrap().push(events.clone());

        match &plan.init {
            InitBehavior::Ready => events.post(WorkerEvent::Ready),
            InitBehavior::Fail(message) => events.post(WorkerEvent::InitError(message.clone())),
        }

        Ok(Box::new(ScriptedWorker {
            events,
            replies: plan.replies.into(),
            dispatches: Arc::clone(&self.dispatches),
            terminated: Arc::clone(&self.terminated),
            pending: Vec::new(),
        }))
    }
}

struct ScriptedWorker {
    events: EventSink,
    replies: VecDeque<ScriptedReply>,
    dispatches: Arc<Mutex<Vec<ExecutionRequest>>>,
    terminated: Arc<AtomicUsize>,
    pending: Vec<JoinHandle<()>>,
}

#[async_trait]
impl WorkerHandle for ScriptedWorker {
    async fn dispatch(&mut self, request: &ExecutionRequest) -> Result<(), SandboxError> {
        self.dispatches.lock().unwrap().push(request.clone());
        let reply = self.replies.pop_front().unwrap_or(ScriptedReply::Hang);
        let events = self.events.clone();
        let request_id = request.id;
        match reply {
            ScriptedReply::Success { delay, output } => {
                self.pending.push(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    events.post(WorkerEvent::Result(ExecutionResult {
                        request_id,
                        output,
                        success: true,
                        error_message: None,
                    }));
                }));
            }
            ScriptedReply::Failure { delay, error } => {
                self.pending.push(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    events.post(WorkerEvent::Result(ExecutionResult {
                        request_id,
                        output: String::new(),
                        success: false,
                        error_message: Some(error),
                    }));
                }));
            }
            ScriptedReply::Hang => {}
        }
        Ok(())
    }

    async fn terminate(&mut self) {
        for handle in self.pending.drain(..) {
            handle.abort();
        }
        self.terminated.fetch_add(1, Ordering::SeqCst);
    }
}
