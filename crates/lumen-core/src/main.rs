//! Lumen Server - Entry Point
//!
//! This binary starts the Lumen HTTP server.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use lumen_core::{config::Config, server};
use lumen_models::BackendType;

const DEFAULT_LOG_FILTER: &str = "lumen_core=debug,lumen_models=debug,info";

/// Query-to-image generation server.
#[derive(Debug, Parser)]
#[command(name = "lumen-server", version, about)]
struct Args {
    /// Path to a TOML config file (defaults to ./lumen.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind, e.g. 127.0.0.1:8000.
    #[arg(long)]
    address: Option<SocketAddr>,

    /// Directory holding index.html and the front-end assets.
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Model backend: gemini or mock.
    #[arg(long)]
    backend: Option<BackendType>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = Config::load(args.config.as_deref()).context("failed to load configuration")?;

    if let Some(address) = args.address {
        config.server.address = address;
    }
    if let Some(static_dir) = &args.static_dir {
        config.server.static_dir.clone_from(static_dir);
    }
    if let Some(backend) = args.backend {
        config.gateway.backend = backend;
    }

    Ok(config)
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    server::run(&config).await.context("server error")
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    let args = Args::parse();
    init_tracing(args.log_json);

    if let Err(e) = run(args).await {
        error!(error = %format!("{e:#}"), "Lumen server exited with an error");
        std::process::exit(1);
    }
}
