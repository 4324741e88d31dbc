use thiserror::Error;

/// Result type shared by the codec, the stores and the link service.
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid short code: {0}")]
    InvalidCode(String),
    #[error("no link for code: {0}")]
    NotFound(String),
    #[error("invalid list range: {0}")]
    InvalidRange(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
}

impl CoreError {
    /// Whether the failure came from the backend rather than from the request.
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_) | Self::InvalidData(_))
    }
}
