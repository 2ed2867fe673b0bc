//! Collaborator boundary for interaction persistence and reward events
//!
//! The core calls these hooks but does not implement them: persistence of
//! `{source, output, success}` happens for every completed run, and the reward
//! hook fires only for successful ones. Whatever rate limiting or daily caps
//! the reward subsystem applies are its own concern — the core neither knows
//! nor duplicates them. Hook failures are logged and ignored; they never feed
//! back into the execution state machine.

use async_trait::async_trait;

use crate::core_types::SessionContext;
use crate::errors::RunnerError;

/// One completed interaction, as handed to the persistence hook. On failure,
/// `output` carries the error message instead of captured output.
#[derive(Debug, Clone)]
pub struct InteractionRecord {
    pub source: String,
    pub output: String,
    pub success: bool,
}

#[async_trait]
pub trait ResultReporter: Send + Sync {
    async fn persist_interaction(
        &self,
        ctx: &SessionContext,
        record: InteractionRecord,
    ) -> Result<(), RunnerError>;

    async fn on_successful_execution(&self, ctx: &SessionContext) -> Result<(), RunnerError>;
}

/// Reporter that drops everything, for standalone and development use.
#[derive(Debug, Clone, Default)]
pub struct NoopReporter;

impl NoopReporter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResultReporter for NoopReporter {
    async fn persist_interaction(
        &self,
        _ctx: &SessionContext,
        record: InteractionRecord,
    ) -> Result<(), RunnerError> {
        log::debug!(
            "dropping interaction record ({} bytes of source, success={})",
            record.source.len(),
            record.success
        );
        Ok(())
    }

    async fn on_successful_execution(&self, _ctx: &SessionContext) -> Result<(), RunnerError> {
        Ok(())
    }
}
