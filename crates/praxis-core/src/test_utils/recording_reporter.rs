//! Reporter fake that records every hook invocation.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::core_types::SessionContext;
use crate::errors::RunnerError;
use crate::reporter::{InteractionRecord, ResultReporter};

#[derive(Default)]
pub struct RecordingReporter {
    interactions: Mutex<Vec<InteractionRecord>>,
    successes: AtomicUsize,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interactions(&self) -> Vec<InteractionRecord> {
        self.interactions.lock().unwrap().clone()
    }

    pub fn success_count(&self) -> usize {
        self.successes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResultReporter for RecordingReporter {
    async fn persist_interaction(
        &self,
        _ctx: &SessionContext,
        record: InteractionRecord,
    ) -> Result<(), RunnerError> {
        self.interactions.lock().unwrap().push(record);
        Ok(())
    }

    async fn on_successful_execution(&self, _ctx: &SessionContext) -> Result<(), RunnerError> {
        self.successes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
