//! Core type definitions for the host-worker execution protocol
//!
//! This module defines the data structures exchanged between the execution
//! host, the sandboxed worker, and UI subscribers. The contract is built
//! around strict result correlation: every request carries a monotonically
//! increasing id, and a result is only ever acted upon when its id matches the
//! request currently in flight. These types are the lingua franca of the
//! runtime; everything else in the crate is machinery around them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::transcript::OutputLine;

/// A single accepted submission, owned by the host until superseded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub id: u64,
    pub source: String,
    pub submitted_at: DateTime<Utc>,
}

impl ExecutionRequest {
    pub fn new(id: u64, source: impl Into<String>) -> Self {
        Self {
            id,
            source: source.into(),
            submitted_at: Utc::now(),
        }
    }
}

/// Outcome of one execution, produced by the worker and consumed at most once
/// by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub request_id: u64,
    pub output: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Lifecycle state of the host's single worker, owned exclusively by the host.
///
/// `Terminated` is the fatal init-failure dead end; every destructive
/// termination (timeout, user stop, crash) passes through `Uninitialized`
/// straight back into `Initializing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    Uninitialized,
    Initializing,
    Ready,
    Busy,
    Terminated,
}

/// Opaque identifiers threaded through to the result reporter. The core never
/// interprets them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: String,
    pub lesson_id: String,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>, lesson_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            lesson_id: lesson_id.into(),
        }
    }
}

/// Value published to UI subscribers on every observable change.
#[derive(Debug, Clone, Serialize)]
pub struct HostSnapshot {
    pub state: WorkerState,
    pub lines: Vec<OutputLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_result: Option<ExecutionResult>,
}

impl HostSnapshot {
    pub fn initial() -> Self {
        Self {
            state: WorkerState::Uninitialized,
            lines: Vec::new(),
            last_result: None,
        }
    }
}
