//! Vaccine booking API server.
//!
//! Run from repo root: `cargo run -p vacq-server`

use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use vacq_api::{
    build_app, db, install_panic_hook, serve, AppConfig, AppState, FatalSignal, MemoryStore, SharedStore,
    EXIT_STARTUP,
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vacq_api=info,vacq_server=info,tower_http=info")),
        )
        .init();

    let fatal = FatalSignal::new();
    install_panic_hook(fatal.clone());

    let (listener, app) = match start().await {
        Ok(ready) => ready,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            return ExitCode::from(EXIT_STARTUP as u8);
        }
    };

    match serve(listener, app, fatal).await {
        Ok(outcome) => {
            tracing::info!(?outcome, "server stopped");
            ExitCode::from(outcome.exit_code() as u8)
        }
        Err(e) => {
            tracing::error!(error = %e, "server error");
            ExitCode::from(vacq_api::EXIT_FATAL as u8)
        }
    }
}

async fn start() -> Result<(TcpListener, axum::Router), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let store: SharedStore = match &config.database_url {
        Some(url) => Arc::new(db::connect(url, config.database_max_connections).await?),
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store, data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let addr = config.bind_addr()?;
    let environment = config.environment;
    let app = build_app(AppState::new(store, config));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        env = environment.as_str(),
        "listening on http://{}",
        listener.local_addr()?
    );
    Ok((listener, app))
}
