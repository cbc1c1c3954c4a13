use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::AbortHandle;

use crate::domain::ids::ChannelId;
use crate::services::{ChannelService, DeleteOutcome};
use crate::workflow::close::CloseState;

/// Pending channel deletions, one per channel, cancellable until they fire.
#[derive(Default)]
pub struct DeletionScheduler {
    pending: Mutex<HashMap<ChannelId, AbortHandle>>,
}

impl DeletionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(
        self: &Arc<Self>,
        channels: Arc<dyn ChannelService>,
        channel: ChannelId,
        delay: Duration,
    ) {
        let scheduler = Arc::clone(self);
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if pending.contains_key(&channel) {
            tracing::debug!(channel_id = %channel, "deletion already scheduled");
            return;
        }

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            scheduler.finish(channel);
            match channels.delete_channel(channel).await {
                Ok(DeleteOutcome::Deleted) => {
                    tracing::info!(channel_id = %channel, state = %CloseState::Deleted, "ticket channel deleted");
                }
                Ok(DeleteOutcome::NotFound) => {
                    tracing::debug!(channel_id = %channel, state = %CloseState::Deleted, "ticket channel already gone");
                }
                Err(err) => {
                    tracing::warn!(channel_id = %channel, error = %err, "failed to delete ticket channel");
                }
            }
        });
        pending.insert(channel, task.abort_handle());
    }

    /// Cancels a pending deletion. Ticket code calls this through
    /// `lifecycle::retire_vanished` when it finds the channel already removed; a
    /// deletion nobody cancelled just reports the channel as gone when it fires.
    pub fn cancel(&self, channel: ChannelId) -> bool {
        let handle = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&channel);
        match handle {
            Some(handle) => {
                handle.abort();
                tracing::debug!(channel_id = %channel, "pending deletion cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, channel: ChannelId) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&channel)
    }

    fn finish(&self, channel: ChannelId) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&channel);
    }
}
