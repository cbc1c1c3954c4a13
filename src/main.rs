mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod server;
mod services;
mod store;
mod transcript;
mod workflow;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::panel::{self, PanelArgs};
use crate::cmd::serve;
use crate::config::AppConfig;
use crate::error::AppResult;

#[derive(Parser)]
#[command(
    name = "supportdesk",
    author,
    version,
    about = "Discord support tickets with archived transcripts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interaction endpoint and transcript host.
    Serve,
    /// Manage the ticket panel message.
    Panel(PanelArgs),
    /// Manage stored configuration.
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config(args) => {
            config_cmd::run(args.command)?;
            Ok(())
        }
        Commands::Serve => serve::run(AppConfig::load()?).await,
        Commands::Panel(args) => {
            let published = panel::run(AppConfig::load()?, args.command).await?;
            println!(
                "Ticket panel posted in channel {} (message {}).",
                published.channel, published.message
            );
            Ok(())
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
