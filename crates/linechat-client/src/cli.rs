//! Command-line interface definitions and parsing

use clap::Parser;

#[derive(Parser)]
#[command(author, version, about = "linechat terminal client", long_about = None)]
pub struct Args {
    /// Relay host to connect to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Relay TCP port
    #[arg(short, long)]
    pub port: u16,

    /// Display name to propose first (prompted interactively if taken)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
