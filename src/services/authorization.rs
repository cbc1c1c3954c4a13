use async_trait::async_trait;

use crate::domain::ids::{GuildId, UserId};
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Staff,
}

#[async_trait]
pub trait AuthorizationService: Send + Sync {
    async fn has_capability(
        &self,
        guild: GuildId,
        actor: UserId,
        capability: Capability,
    ) -> AppResult<bool>;
}
