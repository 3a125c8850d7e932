//! ConsultHub Server: real-time consultation platform
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

use consulthub_api::Stores;
use consulthub_core::config::AppConfig;
use consulthub_core::error::AppError;
use consulthub_storage::{MemoryMessageStore, MemorySessionStore, MemoryWalletStore};

/// Command-line arguments of the server binary.
#[derive(Parser, Debug)]
#[command(name = "consulthub-server", version, about = "ConsultHub session server")]
struct Args {
    /// Base configuration file.
    #[arg(long, env = "CONSULTHUB_CONFIG", default_value = "config/default.toml")]
    config: String,

    /// Environment overlay loaded from `config/{env}.toml`.
    #[arg(long, env = "CONSULTHUB_ENV", default_value = "development")]
    env: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match AppConfig::load(&args.config, &args.env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!("Loaded config from '{}' (env: {})", args.config, args.env);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting ConsultHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Persistence collaborators ────────────────────────
    let stores = Stores {
        sessions: Arc::new(MemorySessionStore::new()),
        messages: Arc::new(MemoryMessageStore::new()),
        wallet: Arc::new(MemoryWalletStore::new()),
    };

    // ── Step 2: Engines and services ─────────────────────────────
    let addr = config.server.bind_address();
    let state = consulthub_api::build_state(config, stores);

    // ── Step 3: Background sweepers ──────────────────────────────
    let cancel = CancellationToken::new();
    let tasks = consulthub_api::spawn_background(&state, &cancel);

    // ── Step 4: HTTP server ──────────────────────────────────────
    let app = consulthub_api::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("ConsultHub server listening on {}", addr);

    // ── Step 5: Graceful shutdown ────────────────────────────────
    let shutdown_state = state.clone();
    let shutdown_cancel = cancel.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        consulthub_api::shutdown(&shutdown_state, &shutdown_cancel);
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    tracing::info!("Waiting for background tasks to complete...");
    for handle in tasks {
        let _ = tokio::time::timeout(Duration::from_secs(10), handle).await;
    }

    tracing::info!("ConsultHub server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
