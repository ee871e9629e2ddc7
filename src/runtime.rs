//! Runtime - Cancellable scheduled tasks

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Holds at most one pending task. Scheduling replaces (aborts) the
/// previous one; `cancel` aborts it outright.
#[derive(Clone, Default)]
pub struct RefreshScheduler {
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl RefreshScheduler {
    pub fn new() -> Self { Self::default() }

    /// Run `task` after `delay` on the current tokio runtime.
    pub fn schedule<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            task.await;
        });
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(prev) = pending.replace(handle) {
            prev.abort();
        }
    }

    /// Abort the pending task, if any. Returns whether one was still running.
    pub fn cancel(&self) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        match pending.take() {
            Some(handle) => {
                let running = !handle.is_finished();
                handle.abort();
                running
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        let pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        pending.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }
}
