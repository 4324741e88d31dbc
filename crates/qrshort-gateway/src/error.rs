use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use qrshort_core::CoreError;
use thiserror::Error;
use tracing::{error, warn};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),
    /// `/dec` reports lookup failures with the legacy 417 status.
    #[error("URL Not Found.  Error: {0}")]
    DecodeFailed(CoreError),
    #[error("not authorized")]
    Unauthorized,
    #[error("expected `{0}` parameter")]
    MissingParam(&'static str),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported method {0}")]
    UnsupportedMethod(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Core(e) => match e {
                CoreError::InvalidCode(_) | CoreError::InvalidRange(_) | CoreError::InvalidUrl(_) => {
                    StatusCode::BAD_REQUEST
                }
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                CoreError::BackendUnavailable(_) | CoreError::InvalidData(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::DecodeFailed(e) if e.is_backend() => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::DecodeFailed(_) => StatusCode::EXPECTATION_FAILED,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::MissingParam(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedMethod(_) => StatusCode::IM_A_TEAPOT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, format!("Error: {self}\n")).into_response()
    }
}
