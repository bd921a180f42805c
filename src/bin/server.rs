//! logkv Server Binary
//!
//! Loads the YAML configuration, recovers the engine, and serves TCP/UDP
//! traffic until SIGINT/SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use logkv::network::Server;
use logkv::{Config, Engine};

/// logkv Server
#[derive(Parser, Debug)]
#[command(name = "logkv-server")]
#[command(about = "Embedded LSM key-value store over a line-oriented protocol")]
#[command(version)]
struct Args {
    /// Path to the YAML config file; all keys optional, missing file = defaults
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Override the configured listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the configured TCP port
    #[arg(long)]
    port: Option<u16>,

    /// Override the configured Disk Store directory
    #[arg(long)]
    directory: Option<PathBuf>,
}

fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,logkv=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    let mut config = match Config::load_or_default(&args.config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(directory) = args.directory {
        config.directory = directory;
    }

    tracing::info!("logkv v{}", logkv::VERSION);
    tracing::info!("config: {}", args.config.display());

    // Recovery failure is fatal: never serve from a partially applied state.
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("failed to recover engine: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = Engine::start_persist_cycle(&engine) {
        tracing::error!("failed to start persist cycle: {}", e);
        std::process::exit(1);
    }

    let mut server = Server::new(config, engine);

    // Graceful shutdown on SIGINT/SIGTERM: stop accepting, drain workers,
    // let the persist cycle finish, sync the WAL.
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("received shutdown signal");
        shutdown.store(true, std::sync::atomic::Ordering::Relaxed);
    }) {
        tracing::error!("failed to install signal handler: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = server.run() {
        tracing::error!("server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("server stopped");
}
