//! HTTP front end for qrshort.
//!
//! Routes requests to the link service, checks the shared auth token and
//! maps failures to the legacy status codes.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod state;
pub mod telemetry;
pub mod vars;

pub use app::App;
pub use config::Config;
pub use state::AppState;
