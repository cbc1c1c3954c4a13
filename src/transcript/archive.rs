use crate::domain::ids::{ChannelId, GuildId, MessageId, UserId};
use crate::domain::transcript::{TranscriptMessage, TranscriptRecord};
use crate::error::{AppError, AppResult};
use crate::services::MessageService;

/// Largest page the message history endpoint hands out.
pub const PAGE_SIZE: usize = 100;

/// Walks the channel history backwards page by page, then orders it oldest first.
///
/// Pages are fetched strictly one after another since each cursor comes from the
/// previous page. Any failed page aborts the whole archive. Author name colours are
/// looked up once per distinct author; a failed lookup only costs the colours.
pub async fn archive_channel(
    messages: &dyn MessageService,
    guild: GuildId,
    channel: ChannelId,
) -> AppResult<TranscriptRecord> {
    let mut collected = Vec::new();
    let mut cursor: Option<MessageId> = None;
    let mut pages = 0usize;

    loop {
        let page = messages
            .fetch_page(channel, cursor, PAGE_SIZE)
            .await
            .map_err(|err| {
                AppError::ArchiveFetchFailed(format!(
                    "page {} of channel {channel}: {err}",
                    pages + 1
                ))
            })?;
        pages += 1;

        let fetched = page.len();
        if fetched == 0 {
            break;
        }

        let oldest = page.iter().map(|message| message.id).min();
        collected.extend(page);

        if fetched < PAGE_SIZE {
            break;
        }
        if oldest.is_none() || oldest == cursor {
            tracing::warn!(channel_id = %channel, "history cursor stopped advancing");
            break;
        }
        cursor = oldest;
    }

    collected.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
    collected.dedup_by_key(|message| message.id);
    apply_member_colors(messages, guild, channel, &mut collected).await;

    tracing::debug!(
        channel_id = %channel,
        pages,
        messages = collected.len(),
        "channel history archived"
    );
    Ok(TranscriptRecord {
        messages: collected,
    })
}

async fn apply_member_colors(
    messages: &dyn MessageService,
    guild: GuildId,
    channel: ChannelId,
    collected: &mut [TranscriptMessage],
) {
    let mut authors: Vec<UserId> = collected.iter().map(|message| message.author_id).collect();
    authors.sort_unstable();
    authors.dedup();
    if authors.is_empty() {
        return;
    }

    match messages.member_colors(guild, &authors).await {
        Ok(colors) => {
            for message in collected.iter_mut() {
                if let Some(color) = colors.get(&message.author_id) {
                    message.color_hex = Some(color.clone());
                }
            }
        }
        Err(err) => {
            tracing::warn!(channel_id = %channel, error = %err, "member colours unavailable");
        }
    }
}
