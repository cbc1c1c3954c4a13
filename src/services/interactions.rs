use async_trait::async_trait;

use crate::error::AppResult;

/// Follow-up channel for interactions that were answered with a deferred response.
#[async_trait]
pub trait InteractionFollowup: Send + Sync {
    async fn edit_original_response(&self, token: &str, content: &str) -> AppResult<()>;
}
