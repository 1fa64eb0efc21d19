//! Serve command handler
//!
//! Starts the HTTP server in foreground mode.

use crate::config::Config;
use crate::error::Result;
use crate::server::{self, state::AppState};
use clap::Args;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Serve command arguments
#[derive(Args)]
pub struct ServeArgs {
    /// Host address to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Keep keys in memory instead of PostgreSQL
    #[arg(long)]
    pub memory: bool,
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // A missing .env file is fine
    dotenvy::dotenv().ok();

    // Load and optionally override config
    let mut config = Config::load_with_env()?;

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    if !config.mail.has_credentials() {
        warn!("EMAIL_ADDRESS or EMAIL_PASSWORD not set, keys will be returned instead of mailed");
    }

    let state = if args.memory {
        warn!("Using in-memory key store, issued keys are lost on exit");
        AppState::in_memory(config)
    } else {
        AppState::from_config(config)?
    };

    if let Err(e) = state.store().ensure_schema().await {
        warn!("Could not prepare key store, continuing: {}", e);
    }

    info!(
        "Starting q-keygen server v{} on {} (source: {}, store: {})",
        env!("CARGO_PKG_VERSION"),
        state.config.server_addr(),
        state.source().name(),
        state.store().name()
    );

    // Run the server
    server::run(state).await
}
