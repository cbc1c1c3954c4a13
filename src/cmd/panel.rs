use clap::{Args, Subcommand};

use crate::cmd::build_context;
use crate::config::AppConfig;
use crate::domain::ids::ChannelId;
use crate::error::AppResult;
use crate::workflow::panel::{PublishedPanel, publish_panel};

#[derive(Args, Debug, Clone)]
pub struct PanelArgs {
    #[command(subcommand)]
    pub command: PanelCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PanelCommand {
    /// Post (and pin) the ticket panel.
    Publish {
        /// Channel to post in; defaults to TICKETS_CHANNEL_ID.
        #[arg(short, long)]
        channel: Option<ChannelId>,
    },
}

pub async fn run(config: AppConfig, command: PanelCommand) -> AppResult<PublishedPanel> {
    let ctx = build_context(&config)?;
    match command {
        PanelCommand::Publish { channel } => publish_panel(&ctx, channel).await,
    }
}
