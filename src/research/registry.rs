use crate::events::ProgressEvent;
use crate::types::{AppError, Result};
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

/// Background runs that can still be cancelled.
///
/// Entries are removed when a run's task finishes, whether it completed,
/// failed or was aborted.
#[derive(Default)]
pub struct RunRegistry {
    active: Mutex<HashMap<String, AbortHandle>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a pipeline whose first event has already been taken.
    ///
    /// The task drains `events` to completion. It only starts polling once the
    /// abort handle is registered, so a fast run can never leave a stale entry.
    pub fn spawn<S>(self: &Arc<Self>, run_id: &str, events: S)
    where
        S: Stream<Item = ProgressEvent> + Send + 'static,
    {
        let (ready_tx, ready_rx) = oneshot::channel::<()>();
        let registry = Arc::clone(self);
        let owned_id = run_id.to_string();

        let handle = tokio::spawn(async move {
            if ready_rx.await.is_err() {
                return;
            }
            let mut events = std::pin::pin!(events);
            while let Some(event) = events.next().await {
                if event.is_terminal() {
                    tracing::debug!(
                        run_id = %owned_id,
                        kind = event.kind(),
                        "background run finished"
                    );
                }
            }
            registry.finish(&owned_id);
        });

        self.active
            .lock()
            .insert(run_id.to_string(), handle.abort_handle());
        let _ = ready_tx.send(());
    }

    /// Abort a background run. The stream is dropped at its next suspension
    /// point, so no partial summary is written.
    pub fn cancel(&self, run_id: &str) -> Result<()> {
        match self.active.lock().remove(run_id) {
            Some(handle) => {
                handle.abort();
                tracing::info!(run_id, "run cancelled");
                Ok(())
            }
            None => Err(AppError::NotFound(format!("No active run '{}'", run_id))),
        }
    }

    pub fn is_active(&self, run_id: &str) -> bool {
        self.active.lock().contains_key(run_id)
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    fn finish(&self, run_id: &str) {
        self.active.lock().remove(run_id);
    }
}
