use std::sync::Arc;

use crate::config::SupportSettings;
use crate::services::{
    AuthorizationService, ChannelService, InteractionFollowup, MessageService, TranscriptHost,
};
use crate::store::{IdempotencyStore, OwnerLocks, TicketStore};
use crate::workflow::deletion::DeletionScheduler;

#[derive(Clone)]
pub struct AppContext {
    pub settings: SupportSettings,
    pub channels: Arc<dyn ChannelService>,
    pub messages: Arc<dyn MessageService>,
    pub authorization: Arc<dyn AuthorizationService>,
    pub followups: Arc<dyn InteractionFollowup>,
    pub transcripts: Arc<dyn TranscriptHost>,
    pub tickets: Arc<TicketStore>,
    pub idempotency: Arc<IdempotencyStore>,
    pub owner_locks: Arc<OwnerLocks>,
    pub deletions: Arc<DeletionScheduler>,
}

impl AppContext {
    pub fn new(
        settings: SupportSettings,
        channels: Arc<dyn ChannelService>,
        messages: Arc<dyn MessageService>,
        authorization: Arc<dyn AuthorizationService>,
        followups: Arc<dyn InteractionFollowup>,
        transcripts: Arc<dyn TranscriptHost>,
        tickets: Arc<TicketStore>,
    ) -> Self {
        Self {
            settings,
            channels,
            messages,
            authorization,
            followups,
            transcripts,
            tickets,
            idempotency: Arc::new(IdempotencyStore::new()),
            owner_locks: Arc::new(OwnerLocks::new()),
            deletions: Arc::new(DeletionScheduler::new()),
        }
    }
}
