//! linechat relay server entry point

use anyhow::Context;
use clap::Parser;
use linechat_core::ServerConfig;
use linechat_server::RelayServer;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "linechat relay server", long_about = None)]
struct Args {
    /// TCP port to listen on (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (overrides the config file)
    #[arg(long)]
    bind: Option<String>,

    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let config = load_configuration(&args)?;
    let server = RelayServer::bind(config)
        .await
        .context("failed to bind listener")?;
    info!(addr = %server.local_addr()?, "linechat relay starting");
    server.run().await?;
    info!("linechat relay stopped");
    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();
}

/// Merge the optional config file with CLI overrides.
fn load_configuration(args: &Args) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {path}"))?;
            toml::from_str(&raw).with_context(|| format!("failed to parse config file {path}"))?
        }
        None => ServerConfig::default(),
    };

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = &args.bind {
        config.bind_addr = bind.clone();
    }
    if config.port == 0 && args.port.is_none() && args.config.is_none() {
        anyhow::bail!("a listen port is required: pass --port or a config file");
    }
    Ok(config)
}
