use super::authorize;
use crate::error::Result;
use crate::model::{ExitResponse, StatusResponse};
use crate::state::AppState;
use crate::vars::RequestVars;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracing::info;

pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backend: state.backend_name(),
        requests: state.requests(),
        started_at: state.started_at,
    })
}

pub async fn exit_server_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    vars: RequestVars,
) -> Result<Json<ExitResponse>> {
    authorize(&state, &headers, &vars)?;
    info!("shutdown requested over HTTP");
    state.request_shutdown();
    Ok(Json(ExitResponse { status: "success" }))
}
