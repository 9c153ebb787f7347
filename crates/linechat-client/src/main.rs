//! linechat terminal client entry point

use clap::Parser;
use linechat_client::{cli::Args, client};
use tracing::error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    if let Err(err) = client::run(args).await {
        error!(%err, "client exited with error");
        std::process::exit(1);
    }
    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();
}
