use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;

use crate::context::AppContext;
use crate::domain::ids::{ChannelId, UserId};
use crate::domain::message::{Component, Embed, FileAttachment, OutgoingMessage};
use crate::domain::ticket::Ticket;
use crate::domain::transcript::{TranscriptHeader, TranscriptRecord};
use crate::error::{AppError, AppResult};
use crate::services::Capability;
use crate::transcript::{archive_channel, checksum, render_document, transcript_filename};
use crate::workflow::lifecycle::retire_vanished;

const CLOSE_EVENT: &str = "close";
const CLOSE_CLAIM_TTL: Duration = Duration::from_secs(600);
const CLOSED_COLOR: u32 = 0xed4245;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseState {
    Requested,
    Archiving,
    Reporting,
    Deleting,
    Deleted,
    /// Terminal: the channel is kept so staff can recover the history by hand.
    ArchiveFailed,
}

impl CloseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseState::Requested => "requested",
            CloseState::Archiving => "archiving",
            CloseState::Reporting => "reporting",
            CloseState::Deleting => "deleting",
            CloseState::Deleted => "deleted",
            CloseState::ArchiveFailed => "archive_failed",
        }
    }
}

impl fmt::Display for CloseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptArtifact {
    pub filename: String,
    pub checksum: String,
    pub path: Option<PathBuf>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReport {
    pub ticket: Ticket,
    pub state: CloseState,
    pub message_count: usize,
    pub transcript: TranscriptArtifact,
    /// Set when the logs channel never received the transcript report.
    pub durability_gap: Option<String>,
}

impl CloseReport {
    pub fn user_message(&self) -> String {
        let mut message = format!(
            "🔒 Ticket closed. Transcript archived ({} messages).",
            self.message_count
        );
        if self.durability_gap.is_some() {
            message.push_str(&format!(
                "\n⚠️ The transcript report could not be posted to the logs channel. \
                 It was saved on the bot host as `{}`.",
                self.transcript.filename
            ));
        }
        message
    }
}

/// Closes the ticket living in `channel` on behalf of `actor`.
///
/// Only the owner or a staff member may close. The ticket is marked closed and its
/// channel scheduled for deletion only once the transcript is on disk or in the logs
/// channel; otherwise the channel is left untouched for staff.
pub async fn close_ticket(
    ctx: &AppContext,
    actor: UserId,
    channel: ChannelId,
) -> AppResult<CloseReport> {
    tracing::debug!(channel_id = %channel, actor_id = %actor, state = %CloseState::Requested, "close requested");

    let ticket = ctx
        .tickets
        .get(channel)
        .filter(Ticket::is_open)
        .ok_or(AppError::NotATicketChannel(channel))?;

    authorize(ctx, &ticket, actor).await?;

    let subject = channel.to_string();
    if !ctx.idempotency.claim(CLOSE_EVENT, &subject, CLOSE_CLAIM_TTL) {
        return Err(AppError::CloseInProgress(channel));
    }
    let result = run_close(ctx, actor, ticket).await;
    ctx.idempotency.release(CLOSE_EVENT, &subject);
    result
}

async fn authorize(ctx: &AppContext, ticket: &Ticket, actor: UserId) -> AppResult<()> {
    if ticket.owner_id == actor {
        return Ok(());
    }
    match ctx
        .authorization
        .has_capability(ticket.guild_id, actor, Capability::Staff)
        .await
    {
        Ok(true) => Ok(()),
        Ok(false) => {
            tracing::info!(channel_id = %ticket.channel_id, actor_id = %actor, "close rejected");
            Err(AppError::NotAuthorized)
        }
        Err(err) => {
            tracing::warn!(actor_id = %actor, error = %err, "staff lookup failed, denying close");
            Err(AppError::NotAuthorized)
        }
    }
}

async fn run_close(ctx: &AppContext, actor: UserId, ticket: Ticket) -> AppResult<CloseReport> {
    let channel = ticket.channel_id;
    tracing::info!(channel_id = %channel, state = %CloseState::Archiving, "archiving ticket");

    let record = match archive_channel(ctx.messages.as_ref(), ticket.guild_id, channel).await {
        Ok(record) => record,
        Err(err) => {
            if let Ok(false) = ctx.channels.channel_exists(channel).await {
                tracing::warn!(
                    channel_id = %channel,
                    error = %err,
                    "ticket channel vanished before archiving, retiring ticket"
                );
                retire_vanished(ctx, channel)?;
                return Err(err);
            }
            tracing::error!(
                channel_id = %channel,
                state = %CloseState::ArchiveFailed,
                error = %err,
                "archive failed, keeping channel"
            );
            report_archive_failure(ctx, &ticket, actor, &err).await;
            return Err(err);
        }
    };

    let closed_at = Utc::now();
    tracing::info!(
        channel_id = %channel,
        state = %CloseState::Reporting,
        messages = record.len(),
        "ticket archived"
    );

    let header = TranscriptHeader {
        channel_id: channel,
        channel_name: ticket.channel_name.clone(),
        opener_id: ticket.owner_id,
        opened_at: ticket.created_at,
        closer_id: actor,
        closed_at,
    };
    let document = render_document(&header, &record);
    let filename = transcript_filename(channel, closed_at);
    let digest = checksum(&document);

    let stored = match ctx.transcripts.store(&filename, &document).await {
        Ok(stored) => Some(stored),
        Err(err) => {
            tracing::warn!(channel_id = %channel, error = %err, "failed to write transcript file");
            None
        }
    };
    let transcript = TranscriptArtifact {
        filename,
        checksum: digest,
        path: stored.as_ref().map(|stored| stored.path.clone()),
        url: stored.and_then(|stored| stored.url),
    };

    let report = logs_report(&ticket, actor, &record, &transcript, document);
    let durability_gap = match ctx
        .messages
        .deliver(ctx.settings.logs_channel_id, report)
        .await
    {
        Ok(()) => None,
        Err(err) => {
            tracing::error!(
                channel_id = %channel,
                transcript = %transcript.filename,
                error = %err,
                "transcript report not delivered to logs channel"
            );
            Some(format!("logs report failed: {err}"))
        }
    };

    // the file on disk or the logs report must hold the transcript before anything is closed
    if transcript.path.is_none() && durability_gap.is_some() {
        let err = AppError::TranscriptNotStored(format!(
            "{} was neither written to disk nor delivered to the logs channel",
            transcript.filename
        ));
        tracing::error!(
            channel_id = %channel,
            state = %CloseState::ArchiveFailed,
            error = %err,
            "no durable transcript, keeping channel"
        );
        report_archive_failure(ctx, &ticket, actor, &err).await;
        return Err(err);
    }

    let closed = ctx.tickets.mark_closed(channel, actor, closed_at)?;

    let delay = ctx.settings.delete_delay;
    let notice = OutgoingMessage::text(format!(
        "🔒 Ticket closed by <@{actor}>. This channel will be deleted in {} seconds.",
        delay.as_secs()
    ));
    if let Err(err) = ctx.messages.send(channel, notice).await {
        tracing::debug!(channel_id = %channel, error = %err, "could not post closing notice");
    }

    ctx.deletions.schedule(ctx.channels.clone(), channel, delay);
    tracing::info!(channel_id = %channel, state = %CloseState::Deleting, "ticket deletion scheduled");

    Ok(CloseReport {
        ticket: closed,
        state: CloseState::Deleting,
        message_count: record.len(),
        transcript,
        durability_gap,
    })
}

fn logs_report(
    ticket: &Ticket,
    closer: UserId,
    record: &TranscriptRecord,
    transcript: &TranscriptArtifact,
    document: String,
) -> OutgoingMessage {
    let short_digest = transcript.checksum.get(..16).unwrap_or(&transcript.checksum);
    let embed = Embed {
        title: Some("🎫 Ticket closed".to_string()),
        color: Some(CLOSED_COLOR),
        footer: Some(transcript.filename.clone()),
        ..Embed::default()
    }
    .field(
        "Channel",
        format!("#{} (`{}`)", ticket.channel_name, ticket.channel_id),
        false,
    )
    .field("Owner", format!("<@{}>", ticket.owner_id), true)
    .field("Closed by", format!("<@{closer}>"), true)
    .field("Category", ticket.category.label(), true)
    .field("Messages", record.len().to_string(), true)
    .field("Checksum", format!("`{short_digest}`"), true);

    let message = OutgoingMessage::default().with_embed(embed);
    match &transcript.url {
        Some(url) => message.with_component(Component::LinkButton {
            label: "View transcript".to_string(),
            url: url.clone(),
        }),
        None => message.with_attachment(FileAttachment {
            filename: transcript.filename.clone(),
            content_type: "text/html; charset=utf-8".to_string(),
            bytes: document.into_bytes(),
        }),
    }
}

async fn report_archive_failure(ctx: &AppContext, ticket: &Ticket, actor: UserId, err: &AppError) {
    let notice = OutgoingMessage::text(
        "⚠️ The transcript could not be archived, so this ticket was not closed. \
         Staff has been notified.",
    );
    if let Err(send_err) = ctx.messages.send(ticket.channel_id, notice).await {
        tracing::debug!(channel_id = %ticket.channel_id, error = %send_err, "could not post archive notice");
    }

    let alert = OutgoingMessage::default().with_embed(
        Embed {
            title: Some("⚠️ Transcript archive failed".to_string()),
            description: Some(format!(
                "The channel was kept for manual recovery.\n```{err}```"
            )),
            color: Some(CLOSED_COLOR),
            ..Embed::default()
        }
        .field(
            "Channel",
            format!("<#{}> (`{}`)", ticket.channel_id, ticket.channel_id),
            false,
        )
        .field("Owner", format!("<@{}>", ticket.owner_id), true)
        .field("Requested by", format!("<@{actor}>"), true),
    );
    if let Err(send_err) = ctx
        .messages
        .deliver(ctx.settings.logs_channel_id, alert)
        .await
    {
        tracing::error!(channel_id = %ticket.channel_id, error = %send_err, "could not alert staff about archive failure");
    }
}
