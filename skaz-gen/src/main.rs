//! skaz-gen - narrated story generation service
//!
//! Serves `POST /generate` and `GET /health`. Configuration comes from
//! command-line arguments, environment variables, an optional TOML file and
//! compiled defaults, in that order of precedence.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use skaz_common::config::LoggingConfig;
use skaz_common::StoryConfig;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

use skaz_gen::{AppState, StoryPipeline};

/// Command-line arguments for skaz-gen
#[derive(Parser, Debug)]
#[command(name = "skaz-gen")]
#[command(about = "Narrated story generation service")]
#[command(version)]
struct Args {
    /// Address to bind
    #[arg(long, env = "SKAZ_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "SKAZ_PORT")]
    port: Option<u16>,

    /// TOML configuration file
    #[arg(short, long, env = "SKAZ_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for generated artifacts
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Install the global subscriber with `RUST_LOG` or the compiled default level
///
/// Runs before configuration loading so its warnings are not lost.
fn init_tracing() -> FilterHandle {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(LoggingConfig::default().level));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
    handle
}

/// Switch to the configured level; `RUST_LOG` keeps priority when set
fn apply_logging_config(handle: &FilterHandle, logging: &LoggingConfig, env_override: bool) -> Result<()> {
    if env_override {
        return Ok(());
    }
    handle
        .reload(EnvFilter::new(&logging.level))
        .context("Failed to apply configured log level")?;
    info!(level = %logging.level, "Log filter set from configuration");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter_handle = init_tracing();
    let args = Args::parse();

    let mut config = StoryConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }

    apply_logging_config(
        &filter_handle,
        &config.logging,
        std::env::var_os(EnvFilter::DEFAULT_ENV).is_some(),
    )?;

    info!("Starting skaz-gen v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Build: {} ({})",
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );
    info!("Output directory: {}", config.output_dir.display());
    info!("Language model backend: {:?}", config.llm.backend);

    let pipeline = StoryPipeline::from_config(&config).context("Failed to initialize story pipeline")?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.server.host, config.server.port))?;

    let app = skaz_gen::build_router(AppState::new(pipeline, config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
