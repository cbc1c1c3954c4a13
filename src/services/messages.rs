use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::ids::{ChannelId, GuildId, MessageId, UserId};
use crate::domain::message::OutgoingMessage;
use crate::domain::transcript::TranscriptMessage;
use crate::error::AppResult;

#[async_trait]
pub trait MessageService: Send + Sync {
    async fn send(&self, channel: ChannelId, message: OutgoingMessage) -> AppResult<MessageId>;

    /// Returns up to `limit` messages older than `before`, newest first.
    async fn fetch_page(
        &self,
        channel: ChannelId,
        before: Option<MessageId>,
        limit: usize,
    ) -> AppResult<Vec<TranscriptMessage>>;

    async fn pin(&self, channel: ChannelId, message: MessageId) -> AppResult<()>;

    /// Name colour (`#rrggbb`) of each member that has a coloured role. Members
    /// without one, or no longer in the guild, are left out.
    async fn member_colors(
        &self,
        _guild: GuildId,
        _members: &[UserId],
    ) -> AppResult<HashMap<UserId, String>> {
        Ok(HashMap::new())
    }

    async fn deliver(&self, destination: ChannelId, message: OutgoingMessage) -> AppResult<()> {
        self.send(destination, message).await.map(|_| ())
    }
}
