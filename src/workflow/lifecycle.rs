use chrono::Utc;

use crate::context::AppContext;
use crate::domain::channel::{ChannelName, ChannelSpec};
use crate::domain::ids::{ChannelId, GuildId};
use crate::domain::message::{Component, Embed, OutgoingMessage};
use crate::domain::ticket::{Requester, Ticket, TicketRequest, TicketStatus};
use crate::error::{AppError, AppResult};

pub const TICKET_COLOR: u32 = 0x5ed1da;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(Ticket),
    /// The requester already has an open ticket; nothing new was created.
    Duplicate(Ticket),
}

impl CreateOutcome {
    pub fn ticket(&self) -> &Ticket {
        match self {
            CreateOutcome::Created(ticket) | CreateOutcome::Duplicate(ticket) => ticket,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            CreateOutcome::Created(ticket) => {
                format!("✅ Your ticket is ready: <#{}>", ticket.channel_id)
            }
            CreateOutcome::Duplicate(ticket) => {
                format!("ℹ️ You already have an open ticket: <#{}>", ticket.channel_id)
            }
        }
    }
}

/// Retires a ticket whose channel was removed outside the close workflow. Any
/// pending deletion for the channel is dropped along with the ownership entry.
pub fn retire_vanished(ctx: &AppContext, channel: ChannelId) -> AppResult<()> {
    ctx.deletions.cancel(channel);
    ctx.tickets.mark_gone(channel, Utc::now())
}

/// Opens a private ticket channel for `requester`, or hands back the one they already have.
///
/// The duplicate check and the channel creation run under the requester's
/// (guild, owner) lock, so two quick submissions cannot both create a channel.
pub async fn request_create(
    ctx: &AppContext,
    guild: GuildId,
    requester: &Requester,
    request: TicketRequest,
) -> AppResult<CreateOutcome> {
    if guild != ctx.settings.guild_id {
        return Err(AppError::Validation(
            "tickets are not set up on this server".to_string(),
        ));
    }

    let _guard = ctx.owner_locks.acquire(guild, requester.id).await;

    if let Some(existing) = ctx.tickets.open_ticket_for(guild, requester.id) {
        match ctx.channels.channel_exists(existing.channel_id).await {
            Ok(true) => {
                tracing::info!(
                    owner_id = %requester.id,
                    channel_id = %existing.channel_id,
                    "duplicate ticket request"
                );
                return Ok(CreateOutcome::Duplicate(existing));
            }
            Ok(false) => {
                tracing::warn!(
                    owner_id = %requester.id,
                    channel_id = %existing.channel_id,
                    "ticket channel vanished, retiring stale ownership entry"
                );
                retire_vanished(ctx, existing.channel_id)?;
            }
            Err(err) => {
                tracing::warn!(
                    channel_id = %existing.channel_id,
                    error = %err,
                    "could not verify existing ticket channel"
                );
                return Ok(CreateOutcome::Duplicate(existing));
            }
        }
    }

    let name = ChannelName::for_ticket(request.category, &requester.handle, requester.id);
    let spec = ChannelSpec::private_ticket(
        guild,
        ctx.settings.tickets_category_id,
        name.clone(),
        requester.id,
        ctx.settings.staff_role_id,
    );

    let channel_id = ctx
        .channels
        .create_channel(&spec)
        .await
        .map_err(|err| AppError::ChannelCreateFailed(err.to_string()))?;

    let ticket = Ticket {
        channel_id,
        channel_name: name.as_str().to_string(),
        guild_id: guild,
        owner_id: requester.id,
        category: request.category,
        created_at: Utc::now(),
        status: TicketStatus::Open,
        closed_at: None,
        closed_by: None,
    };

    if let Err(err) = ctx.tickets.insert(ticket.clone()) {
        tracing::error!(channel_id = %channel_id, error = %err, "failed to record ticket owner");
        if let Err(cleanup) = ctx.channels.delete_channel(channel_id).await {
            tracing::error!(
                channel_id = %channel_id,
                error = %cleanup,
                "failed to remove unrecorded ticket channel"
            );
        }
        return Err(AppError::ChannelCreateFailed(format!(
            "could not record ticket ownership: {err}"
        )));
    }

    if let Err(err) = ctx
        .messages
        .send(channel_id, opening_message(&ticket, &request))
        .await
    {
        tracing::warn!(channel_id = %channel_id, error = %err, "failed to post opening message");
    }

    tracing::info!(
        owner_id = %requester.id,
        channel_id = %channel_id,
        category = request.category.as_str(),
        "ticket created"
    );
    Ok(CreateOutcome::Created(ticket))
}

fn opening_message(ticket: &Ticket, request: &TicketRequest) -> OutgoingMessage {
    let category = request.category;
    let embed = Embed {
        author: Some(format!("{} {}", category.emoji(), category.label())),
        description: Some(
            "Thanks for reaching out! A staff member will answer here shortly.\n\
             Add screenshots or any extra details while you wait."
                .to_string(),
        ),
        color: Some(TICKET_COLOR),
        footer: Some("Use the button below once your issue is resolved.".to_string()),
        ..Embed::default()
    }
    .field("Nickname", request.nickname.as_str(), true)
    .field("Mode", request.mode.as_str(), true)
    .field("Detail", request.detail.as_str(), false);

    OutgoingMessage::text(format!("<@{}>", ticket.owner_id))
        .with_embed(embed)
        .with_component(Component::CloseButton)
}
