//! Sandboxed interactive code execution runtime for lesson environments.
//!
//! This crate provides the supervisory machinery that lets an editor run a
//! learner's source text inside an isolated interpreter with enforced time
//! limits, captured output, and destructive cancellation, while guaranteeing
//! that stale results from superseded or killed runs never corrupt subsequent
//! state. The architecture emphasizes strict message correlation and local
//! recovery from every failure a learner can trigger.
//!
//! # Architecture Overview
//!
//! The runtime is organized around a few cooperating components:
//!
//! - **Execution host**: per-session controller owning the worker handle, the
//!   execution-id counter, and the timeout supervisor
//! - **Sandbox workers**: one isolated interpreter process per session,
//!   replaced wholesale on timeout, stop, or crash
//! - **Package resolution**: lexical extraction of allow-listed imports from
//!   submitted source
//! - **Transcript**: append-only classified output lines for the UI
//! - **Reporter boundary**: persistence and reward hooks implemented by the
//!   surrounding platform
//! - **Configuration**: injectable timeout, allow-list, and interpreter
//!   settings with YAML loading

pub mod config;
pub mod core_types;
pub mod errors;
pub mod host;
pub mod packages;
pub mod reporter;
pub mod sandbox;
pub mod traceback;
pub mod transcript;

pub use config::{InterpreterConfig, RunnerConfig};
pub use core_types::{
    ExecutionRequest, ExecutionResult, HostSnapshot, SessionContext, WorkerState,
};
pub use errors::{RunnerError, SandboxError};
pub use host::{ControlOutcome, ExecutionHost, SubmitOutcome};
pub use reporter::{InteractionRecord, NoopReporter, ResultReporter};
pub use sandbox::{PythonSandbox, Sandbox, WorkerHandle};

#[cfg(test)]
pub mod test_utils;
