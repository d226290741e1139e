use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use gator::cli::{Command, CommandRegistry, State};
use gator::config::Config;
use gator::feed::HttpFeedClient;
use gator::storage::Database;

#[derive(Parser, Debug)]
#[command(name = "gator", version, about = "Command-line RSS aggregator")]
struct Args {
    /// Config file to use instead of ~/.gatorconfig.json
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Command to run (register, login, agg, addfeed, browse, ...)
    command: Option<String>,

    /// Arguments passed to the command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let registry = CommandRegistry::standard();

    let Some(name) = args.command else {
        anyhow::bail!(
            "expected a command, one of: {}",
            registry.names().join(", ")
        );
    };

    let config_path = match args.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let db = Database::connect(&config.db_url)
        .await
        .with_context(|| format!("Failed to open database {}", config.db_url))?;
    let client = HttpFeedClient::new().context("Failed to build HTTP client")?;

    let mut state = State::new(db, config, client);
    let command = Command::new(name, args.args);
    registry
        .run(&mut state, &command)
        .await
        .with_context(|| format!("{} failed", command.name))?;
    Ok(())
}
