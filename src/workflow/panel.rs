use crate::context::AppContext;
use crate::domain::ids::{ChannelId, MessageId};
use crate::domain::message::{Component, Embed, OutgoingMessage};
use crate::domain::ticket::TicketCategory;
use crate::error::{AppError, AppResult};
use crate::workflow::lifecycle::TICKET_COLOR;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishedPanel {
    pub channel: ChannelId,
    pub message: MessageId,
}

pub fn panel_message() -> OutgoingMessage {
    let embed = Embed {
        author: Some("Support • Tickets".to_string()),
        description: Some(
            [
                "Need help from staff? Open a ticket and we will follow up privately.",
                "",
                "• Explain your case with as much detail as possible.",
                "• Include screenshots, ids or anything else that helps.",
                "• Be respectful and patient while we get back to you 🙏",
            ]
            .join("\n"),
        ),
        color: Some(TICKET_COLOR),
        footer: Some("Estimated response time: 1–2 hours".to_string()),
        ..Embed::default()
    };

    OutgoingMessage::default()
        .with_embed(embed)
        .with_component(Component::CategorySelect(TicketCategory::ALL.to_vec()))
}

/// Posts the ticket panel and pins it. A failed pin does not fail the publish.
pub async fn publish_panel(
    ctx: &AppContext,
    channel_override: Option<ChannelId>,
) -> AppResult<PublishedPanel> {
    let channel = channel_override
        .or(ctx.settings.panel_channel_id)
        .ok_or_else(|| {
            AppError::Configuration("no tickets channel configured (TICKETS_CHANNEL_ID)".to_string())
        })?;

    let message = ctx.messages.send(channel, panel_message()).await?;
    if let Err(err) = ctx.messages.pin(channel, message).await {
        tracing::debug!(channel_id = %channel, error = %err, "could not pin ticket panel");
    }

    tracing::info!(channel_id = %channel, "ticket panel published");
    Ok(PublishedPanel { channel, message })
}
