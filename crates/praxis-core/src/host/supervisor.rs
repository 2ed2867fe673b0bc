// src/host/supervisor.rs

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One-shot, per-request execution timer.
///
/// Expiry is delivered to the host loop as an event carrying the request id
/// the timer was armed for; disarming with any other id is a no-op. The timer
/// fires host-side, so enforcement never depends on the worker cooperating.
pub(crate) struct TimeoutSupervisor {
    duration: Duration,
    expiry_tx: mpsc::UnboundedSender<u64>,
    armed: Option<(u64, JoinHandle<()>)>,
}

impl TimeoutSupervisor {
    pub(crate) fn new(duration: Duration, expiry_tx: mpsc::UnboundedSender<u64>) -> Self {
        Self {
            duration,
            expiry_tx,
            armed: None,
        }
    }

    pub(crate) fn arm(&mut self, request_id: u64) {
        self.disarm_current();
        let tx = self.expiry_tx.clone();
        let duration = self.duration;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = tx.send(request_id);
        });
        self.armed = Some((request_id, handle));
    }

    pub(crate) fn disarm(&mut self, request_id: u64) {
        match &self.armed {
            Some((armed_id, _)) if *armed_id == request_id => self.disarm_current(),
            _ => {}
        }
    }

    fn disarm_current(&mut self) {
        if let Some((_, handle)) = self.armed.take() {
            handle.abort();
        }
    }
}

impl Drop for TimeoutSupervisor {
    fn drop(&mut self) {
        self.disarm_current();
    }
}
