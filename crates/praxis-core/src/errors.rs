//! Error types for failure handling across the execution runtime
//!
//! This module provides the error hierarchy for the host, the sandbox worker,
//! and the collaborator boundary. Every failure a learner can trigger is fully
//! recovered locally and surfaced as a transcript line plus a `success` flag;
//! the error types here exist for the seams between components, not for the
//! UI. The design keeps a broad runner-level enum for the public surface and a
//! narrower process-level enum for sandbox plumbing, so callers can match on
//! what they can actually act upon.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum RunnerError {
    #[error("sandbox error: {0}")]
    Sandbox(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("execution host unavailable: {0}")]
    HostUnavailable(String),
    #[error("reporting error: {0}")]
    Reporter(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for RunnerError {
    fn from(err: std::io::Error) -> Self {
        RunnerError::Io(err.to_string())
    }
}

impl From<SandboxError> for RunnerError {
    fn from(err: SandboxError) -> Self {
        RunnerError::Sandbox(err.to_string())
    }
}

// Specific error for the process-based sandbox worker
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("interpreter '{0}' not found on PATH")]
    InterpreterNotFound(String),
    #[error("I/O error during sandbox operation: {0}")]
    IoError(#[from] std::io::Error),
    #[error("could not materialize driver script: {0}")]
    DriverScript(String),
    #[error("worker process streams were not captured")]
    MissingStreams,
    #[error("malformed protocol frame: {0}")]
    Protocol(#[from] serde_json::Error),
}
