mod status;

pub use status::{ExitResponse, StatusResponse};
