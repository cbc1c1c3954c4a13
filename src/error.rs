use std::io;

use thiserror::Error;

use crate::domain::ids::ChannelId;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("discord error: {0}")]
    Platform(String),
    #[error("ticket store error: {0}")]
    Storage(String),
    #[error("failed to create ticket channel: {0}")]
    ChannelCreateFailed(String),
    #[error("not authorized to close this ticket")]
    NotAuthorized,
    #[error("channel {0} is not an open ticket")]
    NotATicketChannel(ChannelId),
    #[error("a close is already in progress for channel {0}")]
    CloseInProgress(ChannelId),
    #[error("failed to archive ticket history: {0}")]
    ArchiveFetchFailed(String),
    #[error("transcript could not be stored: {0}")]
    TranscriptNotStored(String),
    #[error("invalid interaction signature")]
    Signature,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl AppError {
    /// Short outcome shown back to the Discord user.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(reason) => format!("❌ {reason}"),
            AppError::ChannelCreateFailed(_) => {
                "❌ Your ticket could not be created. Please try again in a moment.".to_string()
            }
            AppError::NotAuthorized => {
                "❌ Only the ticket owner or staff can close this ticket.".to_string()
            }
            AppError::NotATicketChannel(_) => {
                "❌ This channel is not an open ticket.".to_string()
            }
            AppError::CloseInProgress(_) => "⏳ This ticket is already being closed.".to_string(),
            AppError::ArchiveFetchFailed(_) | AppError::TranscriptNotStored(_) => {
                "⚠️ The transcript could not be archived. The channel was kept for staff review."
                    .to_string()
            }
            _ => "❌ Something went wrong while handling your request.".to_string(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
