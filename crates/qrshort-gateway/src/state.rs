use crate::auth::AuthToken;
use jiff::Timestamp;
use qrshort_service::{LinkService, RedirectService};
use qrshort_storage::Backend;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone)]
pub struct AppState {
    pub links: LinkService<Backend>,
    pub redirector: RedirectService<Backend>,
    pub auth: AuthToken,
    /// Destination of `data` side files; unset disables them.
    pub data_dir: Option<PathBuf>,
    pub started_at: Timestamp,
    requests: Arc<AtomicU64>,
    shutdown: Arc<Notify>,
}

impl AppState {
    /// Builds the state. Spawns the hit counter when the backend counts
    /// hits, so it must run inside a tokio runtime.
    pub fn new(backend: Backend, auth: AuthToken, data_dir: Option<PathBuf>) -> Self {
        let links = LinkService::new(backend);
        Self {
            redirector: RedirectService::new(links.clone()),
            links,
            auth,
            data_dir,
            started_at: Timestamp::now(),
            requests: Arc::new(AtomicU64::new(0)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn count_request(&self) -> u64 {
        self.requests.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Asks the server to stop accepting connections.
    pub fn request_shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Resolves once [`AppState::request_shutdown`] has been called.
    pub async fn shutdown_requested(&self) {
        self.shutdown.notified().await;
    }

    pub fn backend_name(&self) -> &'static str {
        self.links.store().name()
    }
}
