use qrshort_core::{LinkStore, ShortCode};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Queue length used by [`HitCounter::spawn`].
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug)]
enum HitEvent {
    Hit(ShortCode),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// Applies hit increments off the request path.
///
/// Hits go through a bounded queue to a single worker task, which calls
/// [`LinkStore::increment_hit`]. Recording never blocks: when the queue is
/// full the hit is dropped with a warning.
#[derive(Debug)]
pub struct HitCounter {
    tx: mpsc::Sender<HitEvent>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl HitCounter {
    /// Starts a worker for `store`. Must be called inside a tokio runtime.
    pub fn spawn<S: LinkStore>(store: Arc<S>) -> Self {
        Self::with_capacity(store, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity<S: LinkStore>(store: Arc<S>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run(store, rx));
        Self {
            tx,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queues one hit for `code`.
    pub fn record(&self, code: ShortCode) {
        if let Err(e) = self.tx.try_send(HitEvent::Hit(code)) {
            warn!(code = %code, error = %e, "dropping hit");
        }
    }

    /// Waits until every hit recorded before this call has been applied.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(HitEvent::Flush(done)).await.is_err() {
            return;
        }
        let _ = wait.await;
    }

    /// Applies the queued hits, then stops the worker. Later hits are dropped.
    pub async fn shutdown(&self) {
        // Send fails only when the worker is already gone.
        let _ = self.tx.send(HitEvent::Shutdown).await;

        let worker = self.worker.lock().await.take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = %e, "hit counter worker panicked");
            }
        }
    }
}

async fn run<S: LinkStore>(store: Arc<S>, mut rx: mpsc::Receiver<HitEvent>) {
    debug!("hit counter started");
    while let Some(event) = rx.recv().await {
        match event {
            HitEvent::Hit(code) => {
                if let Err(e) = store.increment_hit(code).await {
                    error!(code = %code, error = %e, "failed to record hit");
                }
            }
            HitEvent::Flush(done) => {
                let _ = done.send(());
            }
            HitEvent::Shutdown => break,
        }
    }
    debug!("hit counter stopped");
}
