use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Short-lived keys of the form (event type, subject id).
#[derive(Default)]
pub struct IdempotencyStore {
    entries: Mutex<HashMap<(&'static str, String), Instant>>,
}

impl IdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the key was free (or expired) and is now held for `ttl`.
    pub fn claim(&self, event_type: &'static str, subject: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, expires_at| *expires_at > now);

        let key = (event_type, subject.to_string());
        if entries.contains_key(&key) {
            return false;
        }
        entries.insert(key, now + ttl);
        true
    }

    pub fn release(&self, event_type: &'static str, subject: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(&(event_type, subject.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn claims_expire_after_ttl() {
        let store = IdempotencyStore::new();
        assert!(store.claim("close", "42", Duration::from_secs(30)));
        assert!(!store.claim("close", "42", Duration::from_secs(30)));
        assert!(store.claim("interaction", "42", Duration::from_secs(30)));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(store.claim("close", "42", Duration::from_secs(30)));
    }

    #[test]
    fn release_frees_the_key() {
        let store = IdempotencyStore::new();
        assert!(store.claim("close", "1", Duration::from_secs(60)));
        store.release("close", "1");
        assert!(store.claim("close", "1", Duration::from_secs(60)));
    }
}
