use crate::config::LogFormat;
use thiserror::Error;
use tracing::subscriber::{set_global_default, SetGlobalDefaultError};
use tracing_log::log::SetLoggerError;
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to bridge log records: {0}")]
    Log(#[from] SetLoggerError),
    #[error("failed to install subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Installs the global subscriber: `RUST_LOG` filtering plus a human or JSON
/// formatter, with `log` records forwarded into tracing.
pub fn init(format: LogFormat) -> Result<(), TelemetryError> {
    LogTracer::init()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = Registry::default().with(filter);

    match format {
        LogFormat::Fmt => set_global_default(registry.with(tracing_subscriber::fmt::layer()))?,
        LogFormat::Json => set_global_default(
            registry.with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            ),
        )?,
    }

    Ok(())
}
