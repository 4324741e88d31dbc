use crate::error::Result;
use crate::state::AppState;
use axum::extract::{Path, RawQuery, State};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use qrshort_core::CoreError;
use qrshort_service::Redirector;

const X_QR_SHORT: HeaderName = HeaderName::from_static("x-qr-short");

/// Sends the client on to the stored destination with a 307.
pub async fn redirect_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response> {
    let redirect = state.redirector.resolve(&id, query.as_deref()).await?;
    let location = HeaderValue::try_from(redirect.location).map_err(|e| {
        CoreError::InvalidData(format!("destination of '{id}' is not a valid header: {e}"))
    })?;

    Ok((
        StatusCode::TEMPORARY_REDIRECT,
        [
            (header::LOCATION, location),
            (X_QR_SHORT, HeaderValue::from_static("Redirected By")),
        ],
    )
        .into_response())
}
