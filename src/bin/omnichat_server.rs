//! HTTP server binary for OmniChat.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use omnichat::server::{AppState, ChatServer};
use omnichat::{AppConfig, PageRegistry};
use omnichat_search::SearchChain;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Multi-page chat server with internet search.
#[derive(Parser)]
#[command(name = "omnichat-server", version, about)]
struct Cli {
    /// Path to TOML configuration file. Defaults to
    /// `~/.config/omnichat/config.toml` when that file exists.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `[server] host`.
    #[arg(long)]
    host: Option<String>,

    /// Override `[server] port`.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("omnichat=info,omnichat_search=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(path) => AppConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => {
            let path = AppConfig::default_config_path();
            if path.exists() {
                AppConfig::from_file(&path)
                    .with_context(|| format!("failed to load config from {}", path.display()))?
            } else {
                AppConfig::default()
            }
        }
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate().context("invalid configuration")?;

    let chain = SearchChain::from_config(&config.search_config())
        .context("invalid [search] configuration")?;
    info!(backends = ?chain.backend_names(), "search chain ready");

    let pages = PageRegistry::standard(chain);
    let server = ChatServer::start(AppState::new(config, pages)).await?;
    println!("OmniChat v{} listening on http://{}", env!("CARGO_PKG_VERSION"), server.addr());

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("shutting down");
    server.shutdown();
    Ok(())
}
