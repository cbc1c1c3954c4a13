use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTranscript {
    pub path: PathBuf,
    /// Public link when static hosting is configured.
    pub url: Option<String>,
}

#[async_trait]
pub trait TranscriptHost: Send + Sync {
    async fn store(&self, filename: &str, document: &str) -> AppResult<StoredTranscript>;
}
