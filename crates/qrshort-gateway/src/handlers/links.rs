use super::authorize;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::vars::RequestVars;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use qrshort_core::{BulkRequest, ListEntry, ShortCode, UpsertRespItem};
use tracing::{debug, info, warn};

pub async fn encode_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    vars: RequestVars,
) -> Result<String> {
    authorize(&state, &headers, &vars)?;
    let url = vars.require("url")?;

    let code = state.links.shorten(url).await?;
    write_data_file(&state, code, vars.get("data")).await;
    Ok(code.to_string())
}

pub async fn update_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    vars: RequestVars,
) -> Result<String> {
    authorize(&state, &headers, &vars)?;
    let url = vars.require("url")?;
    let id = vars.require("id")?;

    let code = state.links.update(url, id).await?;
    write_data_file(&state, code, vars.get("data")).await;
    Ok(code.to_string())
}

pub async fn decode_path_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<String> {
    decode(&state, &id).await
}

pub async fn decode_query_handler(
    State(state): State<AppState>,
    vars: RequestVars,
) -> Result<String> {
    decode(&state, vars.require("id")?).await
}

async fn decode(state: &AppState, id: &str) -> Result<String> {
    state.links.fetch(id).await.map_err(AppError::DecodeFailed)
}

pub async fn list_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    vars: RequestVars,
) -> Result<Json<Vec<ListEntry>>> {
    authorize(&state, &headers, &vars)?;
    let begin = vars.require("beg")?;
    let end = vars.require("end")?;

    let entries = state.links.list(begin, end).await?;
    debug!(begin, end, entries = entries.len(), "listed links");
    Ok(Json(entries))
}

/// Accepts the batch in the `update` variable or as a JSON request body.
pub async fn bulk_load_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    vars: RequestVars,
) -> Result<Json<Vec<UpsertRespItem>>> {
    authorize(&state, &headers, &vars)?;

    let parsed = match vars.get("update") {
        Some(update) => serde_json::from_str::<BulkRequest>(update),
        None if !vars.body().is_empty() => serde_json::from_slice::<BulkRequest>(vars.body()),
        None => return Err(AppError::MissingParam("update")),
    };
    let request = parsed.map_err(|e| AppError::BadRequest(format!("parse error: {e}")))?;

    let responses = state.links.bulk_upsert(request.data).await;
    let failed = responses.iter().filter(|r| r.msg.starts_with("fail:")).count();
    info!(items = responses.len(), failed, "bulk load finished");
    Ok(Json(responses))
}

/// Stores the optional `data` variable next to the link. Failures are logged
/// and never fail the request.
async fn write_data_file(state: &AppState, code: ShortCode, data: Option<&str>) {
    let (Some(dir), Some(data)) = (&state.data_dir, data) else {
        return;
    };

    let path = dir.join(code.to_string());
    match tokio::fs::write(&path, format!("{data}\n")).await {
        Ok(()) => debug!(code = %code, path = %path.display(), "wrote data file"),
        Err(e) => warn!(code = %code, path = %path.display(), error = %e, "failed to write data file"),
    }
}
