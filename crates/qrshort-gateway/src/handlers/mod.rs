mod links;
mod redirect;
mod status;

pub use links::{
    bulk_load_handler, decode_path_handler, decode_query_handler, encode_handler, list_handler,
    update_handler,
};
pub use redirect::redirect_handler;
pub use status::{exit_server_handler, status_handler};

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::vars::RequestVars;
use axum::http::HeaderMap;

fn authorize(state: &AppState, headers: &HeaderMap, vars: &RequestVars) -> Result<()> {
    if state.auth.is_authorized(headers, vars) {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}
