use jiff::Timestamp;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub backend: &'static str,
    /// Requests served since startup.
    pub requests: u64,
    pub started_at: Timestamp,
}

/// Reply to `/api/v1/exit-server`.
#[derive(Debug, Serialize)]
pub struct ExitResponse {
    pub status: &'static str,
}
