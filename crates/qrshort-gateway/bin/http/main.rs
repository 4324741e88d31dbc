use anyhow::Context;
use clap::Parser;
use qrshort_gateway::auth::AuthToken;
use qrshort_gateway::{telemetry, App, AppState, Config};
use qrshort_storage::Backend;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    telemetry::init(config.log_format)?;

    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage,
        count_hits = config.count_hits,
        "starting qrshort server"
    );

    let backend = Backend::open(config.backend_config())
        .await
        .context("failed to open storage backend")?;

    if let Some(dir) = &config.data_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create data directory {}", dir.display()))?;
    }

    let state = AppState::new(
        backend,
        AuthToken::new(config.auth_token.clone()),
        config.data_dir.clone(),
    );
    let app = App::router(state.clone(), config.www_dir.as_deref());

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await?;

    state.links.shutdown().await;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for interrupt");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = interrupt => info!("received interrupt, shutting down"),
        _ = state.shutdown_requested() => info!("shutting down on request"),
    }
}
