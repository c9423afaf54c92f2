//! thesis-tracker - thesis supervision workflow service
//!
//! Serves the REST API, runs the notification dispatcher, and owns the
//! SQLite database.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use thesis_common::config::{ConfigOverrides, TrackerConfig};
use thesis_common::events::EventBus;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use thesis_tracker::notify::{mailer_from_config, NotificationDispatcher};
use thesis_tracker::{build_router, AppState};

/// Command-line arguments for thesis-tracker
#[derive(Parser, Debug)]
#[command(name = "thesis-tracker")]
#[command(about = "Thesis supervision workflow service")]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(short, long, env = "THESIS_BIND_ADDR")]
    bind: Option<String>,

    /// SQLite database file
    #[arg(short, long, env = "THESIS_DATABASE")]
    database: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = "THESIS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TrackerConfig::resolve(ConfigOverrides {
        bind_addr: args.bind,
        database_path: args.database,
        config_file: args.config,
        log_level: args.log_level,
    })
    .context("Failed to resolve configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    // Build identification first, before any database delay
    info!(
        "Starting thesis-tracker v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Database path: {}", config.database_path.display());

    let pool = match thesis_common::db::init_database(&config.database_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let event_bus = EventBus::new(config.event_capacity);
    let mailer = mailer_from_config(config.smtp.as_ref());
    info!(mailer = mailer.name(), "Notification mailer selected");
    let dispatcher = NotificationDispatcher::new(pool.clone(), mailer).spawn(&event_bus);

    let state = AppState::new(pool, event_bus);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("thesis-tracker listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    dispatcher.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
