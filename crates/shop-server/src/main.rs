//! Game shop TCP server.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use shop_server::config::Config;
use shop_server::server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "shop-server")]
#[clap(about = "Multi-client TCP game shop server")]
struct Cli {
    /// Config file (TOML). Defaults to ./shop.toml when present.
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[clap(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load(cli.config.as_deref())?;

    info!(
        "Starting shop-server on {} (backlog = {}, max_clients = {})",
        config.server.socket_addr_string(),
        config.server.backlog,
        config.server.max_clients
    );

    server::run(config).await
}
