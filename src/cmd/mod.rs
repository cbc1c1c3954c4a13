pub mod config;
pub mod panel;
pub mod serve;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::infra::discord::DiscordClient;
use crate::infra::transcript_dir::TranscriptDirectory;
use crate::store::TicketStore;

/// Wires the Discord adapter, the ticket store and transcript hosting into one context.
pub fn build_context(config: &AppConfig) -> AppResult<AppContext> {
    if config.discord_token.is_none() {
        tracing::warn!("DISCORD_TOKEN not configured; Discord calls will fail");
    }
    if config.public_base_url.is_none() {
        tracing::warn!("PUBLIC_BASE_URL not configured; transcripts will be attached instead of linked");
    }

    let settings = config.support_settings()?;
    let discord = Arc::new(DiscordClient::new(
        config.api_base.clone(),
        config.discord_token.clone(),
        config.application_id.clone(),
        Some(settings.staff_role_id),
    ));
    let transcripts = Arc::new(TranscriptDirectory::new(
        config.transcript_dir.clone(),
        config.public_base_url.clone(),
    ));
    let tickets = Arc::new(TicketStore::load(&config.data_dir)?);
    tracing::info!(
        open_tickets = tickets.open_tickets().len(),
        data_dir = %config.data_dir.display(),
        "ticket store loaded"
    );

    Ok(AppContext::new(
        settings,
        discord.clone(),
        discord.clone(),
        discord.clone(),
        discord,
        transcripts,
        tickets,
    ))
}
