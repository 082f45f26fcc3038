use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use poise::serenity_prelude::UserId;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::error::{BotError, Result};

/// A verification link handed out to a user and not yet redeemed
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationRequest {
    pub id: Uuid,
    pub discord_id: UserId,
    pub onion: bool,
    /// Only present for onion applications
    pub onion_application: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One slot per user and request kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PendingKey {
    discord_id: UserId,
    onion: bool,
}

/// In-memory store of pending verification requests.
///
/// Requests are keyed by `(user, onion)` so the existence check and the
/// insert in [`VerificationStore::start`] happen under one shard lock.
/// Lookups by token scan the map; the number of live requests is small.
#[derive(Debug, Default)]
pub struct VerificationStore {
    pending: DashMap<PendingKey, VerificationRequest>,
}

impl VerificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pending request unless one already exists for this user and kind
    pub fn start(
        &self,
        discord_id: UserId,
        onion: bool,
        onion_application: Option<String>,
    ) -> Result<Uuid> {
        let key = PendingKey { discord_id, onion };

        match self.pending.entry(key) {
            Entry::Occupied(_) => Err(BotError::VerificationPending {
                discord_id: discord_id.to_string(),
                onion,
            }),
            Entry::Vacant(slot) => {
                let id = Uuid::new_v4();
                slot.insert(VerificationRequest {
                    id,
                    discord_id,
                    onion,
                    onion_application: if onion { onion_application } else { None },
                    created_at: Utc::now(),
                });
                debug!("Started verification {} for user {} (onion: {})", id, discord_id, onion);
                Ok(id)
            }
        }
    }

    /// Check if a user has a pending request of the given kind
    pub fn has_pending(&self, discord_id: UserId, onion: bool) -> bool {
        self.pending.contains_key(&PendingKey { discord_id, onion })
    }

    /// Get a pending request by its token
    pub fn lookup(&self, id: Uuid) -> Option<VerificationRequest> {
        self.pending
            .iter()
            .find(|entry| entry.value().id == id)
            .map(|entry| entry.value().clone())
    }

    /// Remove a request by its token; no-op if absent
    pub fn remove(&self, id: Uuid) {
        let Some(key) = self
            .pending
            .iter()
            .find(|entry| entry.value().id == id)
            .map(|entry| *entry.key())
        else {
            return;
        };

        // The slot may have been reused by a fresh request in between
        if self.pending.remove_if(&key, |_, r| r.id == id).is_some() {
            debug!("Removed verification {}", id);
        }
    }

    /// Drop requests older than `ttl`, returning how many were removed
    pub fn purge_expired(&self, ttl: Duration) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_sub_signed(ttl))
        else {
            return 0;
        };
        let before = self.pending.len();
        self.pending.retain(|_, r| r.created_at > cutoff);
        before.saturating_sub(self.pending.len())
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    fn backdate(&self, id: Uuid, age: chrono::Duration) {
        for mut entry in self.pending.iter_mut() {
            if entry.id == id {
                entry.created_at = entry.created_at - age;
            }
        }
    }
}

/// Shared verification store type
pub type SharedVerificationStore = Arc<VerificationStore>;

pub fn create_shared_verification_store() -> SharedVerificationStore {
    Arc::new(VerificationStore::new())
}
