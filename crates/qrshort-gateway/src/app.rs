use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{any, get, post};
use axum::Router;
use std::path::Path;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    bulk_load_handler, decode_path_handler, decode_query_handler, encode_handler,
    exit_server_handler, list_handler, redirect_handler, status_handler, update_handler,
};
use crate::state::AppState;

pub struct App {}

impl App {
    /// Builds the router. Unmatched paths are served from `www_dir` when it
    /// is set.
    pub fn router(state: AppState, www_dir: Option<&Path>) -> Router {
        let router = Router::new()
            .route("/enc", any(encode_handler))
            .route("/enc/", any(encode_handler))
            .route("/upd", any(update_handler))
            .route("/upd/", any(update_handler))
            .route("/dec", get(decode_query_handler))
            .route("/dec/{id}", get(decode_path_handler))
            .route("/list", any(list_handler))
            .route("/list/", any(list_handler))
            .route("/bulkLoad", any(bulk_load_handler))
            .route("/q/{id}", get(redirect_handler))
            .route("/status", get(status_handler))
            .route("/api/v1/status", get(status_handler))
            .route("/api/v1/exit-server", post(exit_server_handler));

        let router = match www_dir {
            Some(dir) => router.fallback_service(ServeDir::new(dir)),
            None => router,
        };

        router
            .layer(middleware::from_fn_with_state(state.clone(), count_requests))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

async fn count_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    state.count_request();
    next.run(request).await
}
