use async_trait::async_trait;

use crate::domain::channel::ChannelSpec;
use crate::domain::ids::ChannelId;
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

#[async_trait]
pub trait ChannelService: Send + Sync {
    /// Creates the channel with its permission overwrites in a single call.
    async fn create_channel(&self, spec: &ChannelSpec) -> AppResult<ChannelId>;
    async fn delete_channel(&self, channel: ChannelId) -> AppResult<DeleteOutcome>;
    async fn channel_exists(&self, channel: ChannelId) -> AppResult<bool>;
}
