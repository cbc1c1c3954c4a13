use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::error::{AppError, AppResult};
use crate::services::{StoredTranscript, TranscriptHost};

/// Writes transcripts into a directory that the HTTP server exposes under `/transcripts`.
pub struct TranscriptDirectory {
    dir: PathBuf,
    public_base_url: Option<String>,
}

impl TranscriptDirectory {
    pub fn new(dir: PathBuf, public_base_url: Option<String>) -> Self {
        Self {
            dir,
            public_base_url: public_base_url.map(|url| url.trim_end_matches('/').to_string()),
        }
    }

    fn public_url(&self, filename: &str) -> Option<String> {
        self.public_base_url
            .as_deref()
            .filter(|base| !base.is_empty())
            .map(|base| format!("{base}/transcripts/{filename}"))
    }
}

#[async_trait]
impl TranscriptHost for TranscriptDirectory {
    async fn store(&self, filename: &str, document: &str) -> AppResult<StoredTranscript> {
        if filename.contains(['/', '\\']) || filename.starts_with('.') {
            return Err(AppError::Validation(format!(
                "refusing to write transcript '{filename}'"
            )));
        }
        fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(filename);
        fs::write(&path, document).await?;
        tracing::debug!(path = %path.display(), "transcript written");

        Ok(StoredTranscript {
            url: self.public_url(filename),
            path,
        })
    }
}
