use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use authorization_server::config::Config;
use authorization_server::session::SessionManager;
use authorization_server::storage::Storage;
use authorization_server::{AppState, router, signing};

#[derive(Parser, Debug)]
#[command(name = "authorization-server")]
#[command(about = "OAuth2 authorization server issuing RS256 JWT access tokens")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Port to listen on
    #[arg(long, default_value_t = 8080, env = "AUTH_PORT")]
    port: u16,

    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0", env = "AUTH_BIND")]
    bind: String,

    /// Path to config directory (config.json, signing keys, persisted state)
    #[arg(long, default_value = "/config", env = "AUTH_CONFIG_PATH")]
    config_path: String,

    /// Public URL for this service (used in metadata and as the token issuer)
    #[arg(long, env = "AUTH_PUBLIC_URL")]
    public_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a bcrypt hash for a client secret or user password
    HashSecret {
        secret: String,

        #[arg(long, default_value_t = bcrypt::DEFAULT_COST)]
        cost: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "authorization_server=info,oauth2_token=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Some(Command::HashSecret { secret, cost }) = &cli.command {
        let hash = bcrypt::hash(secret, *cost).context("Failed to hash secret")?;
        println!("{}", hash);
        return Ok(());
    }

    let public_url = cli
        .public_url
        .clone()
        .unwrap_or_else(|| format!("http://localhost:{}", cli.port));

    // Load configuration, keys and persisted state
    let config = Config::load(&cli.config_path)?;
    let key_pair = signing::load_or_generate(&cli.config_path, &config.signing)?;
    let sessions = SessionManager::from_config(&config.session)?;
    let storage = Storage::open(Path::new(&cli.config_path))
        .with_context(|| format!("Failed to open storage in {}", cli.config_path))?;

    let state = Arc::new(AppState::new(config, storage, &key_pair, sessions, &public_url).await?);
    let app = router(state);

    // Parse bind address
    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port).parse()?;

    tracing::info!("Starting authorization-server on {}", addr);
    tracing::info!("Public URL: {}", public_url);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Authorization server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
