//! Off-thread writer so saves never stall tick processing

use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info};

use super::StateStore;
use crate::{error::Result, state::TimerState};

/// Queues saves for a writer task. Only the newest pending record is
/// written when saves arrive faster than the disk keeps up.
#[derive(Debug)]
pub struct BackgroundStore<S> {
    inner: Arc<S>,
    tx: mpsc::UnboundedSender<TimerState>,
}

impl<S: StateStore + 'static> BackgroundStore<S> {
    /// Spawn the writer task. It exits once the store is dropped and the
    /// queue is drained, so awaiting the handle flushes pending writes.
    pub fn spawn(inner: S) -> (Self, JoinHandle<()>) {
        let inner = Arc::new(inner);
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(writer_task(Arc::clone(&inner), rx));
        (Self { inner, tx }, writer)
    }
}

impl<S: StateStore + 'static> StateStore for BackgroundStore<S> {
    fn load(&self) -> Result<Option<TimerState>> {
        self.inner.load()
    }

    fn save(&self, state: &TimerState) -> Result<()> {
        if self.tx.send(state.clone()).is_err() {
            // Writer is gone, fall back to writing inline
            return self.inner.save(state);
        }
        Ok(())
    }
}

async fn writer_task<S: StateStore + 'static>(
    store: Arc<S>,
    mut rx: mpsc::UnboundedReceiver<TimerState>,
) {
    debug!("State writer task started");

    while let Some(mut latest) = rx.recv().await {
        while let Ok(newer) = rx.try_recv() {
            latest = newer;
        }

        let store = Arc::clone(&store);
        let outcome = tokio::task::spawn_blocking(move || store.save(&latest)).await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Failed to persist timer state: {}", e),
            Err(e) => error!("State writer panicked: {}", e),
        }
    }

    info!("State writer task finished");
}
