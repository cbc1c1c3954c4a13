use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::ids::{GuildId, UserId};

/// One async lock per (guild, owner), held across duplicate-check-and-create.
#[derive(Default)]
pub struct OwnerLocks {
    slots: Mutex<HashMap<(GuildId, UserId), Arc<AsyncMutex<()>>>>,
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, guild: GuildId, owner: UserId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry((guild, owner)).or_default().clone()
        };
        slot.lock_owned().await
    }
}
