use chrono::{DateTime, Utc};

use crate::domain::ids::{ChannelId, MessageId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptAttachment {
    pub filename: String,
    pub url: String,
    pub content_type: Option<String>,
}

impl TranscriptAttachment {
    pub fn is_image(&self) -> bool {
        if let Some(content_type) = &self.content_type {
            return content_type.starts_with("image/");
        }
        let lower = self.filename.to_lowercase();
        [".png", ".jpg", ".jpeg", ".gif", ".webp"]
            .iter()
            .any(|ext| lower.ends_with(ext))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptMessage {
    pub id: MessageId,
    pub author_id: UserId,
    pub author: String,
    pub display_name: String,
    pub color_hex: Option<String>,
    pub avatar_url: String,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    pub attachments: Vec<TranscriptAttachment>,
    pub embed_count: usize,
}

/// Full channel history, oldest message first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptRecord {
    pub messages: Vec<TranscriptMessage>,
}

impl TranscriptRecord {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptHeader {
    pub channel_id: ChannelId,
    pub channel_name: String,
    pub opener_id: UserId,
    pub opened_at: DateTime<Utc>,
    pub closer_id: UserId,
    pub closed_at: DateTime<Utc>,
}
