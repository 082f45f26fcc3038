use dashmap::DashSet;
use poise::serenity_prelude::UserId;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::BotConfig;
use crate::error::{BotError, FinishError, Result};
use crate::guild::SharedGuildGateway;
use crate::integrations::ProfileProvider;
use crate::managers::SharedRoleManager;
use crate::messages;
use crate::state::SharedVerificationStore;

/// Drives a verification from "Verify" click to announcement
pub struct VerificationManager {
    store: SharedVerificationStore,
    profiles: Arc<dyn ProfileProvider>,
    gateway: SharedGuildGateway,
    role_manager: SharedRoleManager,
    config: Arc<BotConfig>,

    /// Tokens whose `finish` is currently running
    in_flight: DashSet<Uuid>,
}

/// Releases an in-flight token on every exit path of `finish`
struct InFlightGuard<'a> {
    set: &'a DashSet<Uuid>,
    id: Uuid,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.id);
    }
}

impl VerificationManager {
    pub fn new(
        store: SharedVerificationStore,
        profiles: Arc<dyn ProfileProvider>,
        gateway: SharedGuildGateway,
        role_manager: SharedRoleManager,
        config: Arc<BotConfig>,
    ) -> Self {
        Self {
            store,
            profiles,
            gateway,
            role_manager,
            config,
            in_flight: DashSet::new(),
        }
    }

    /// Create a pending request and return its token
    pub fn start(
        &self,
        discord_id: UserId,
        onion: bool,
        onion_application: Option<String>,
    ) -> Result<Uuid> {
        let id = self.store.start(discord_id, onion, onion_application)?;
        info!(
            "Started verification {} for user {} (onion: {})",
            id, discord_id, onion
        );
        Ok(id)
    }

    pub fn has_pending(&self, discord_id: UserId, onion: bool) -> bool {
        self.store.has_pending(discord_id, onion)
    }

    /// Check a token without consuming it
    pub fn is_known(&self, id: Uuid) -> bool {
        self.store.lookup(id).is_some()
    }

    /// Redeem a token with an osu! access token.
    ///
    /// The request is removed only when every step succeeded, so a failed
    /// link can be retried. Roles already granted are never rolled back.
    pub async fn finish(&self, id: Uuid, access_token: &str) -> std::result::Result<(), FinishError> {
        if !self.in_flight.insert(id) {
            warn!("Verification {} is already being finished", id);
            return Err(FinishError::AlreadyInProgress { id });
        }
        let _guard = InFlightGuard {
            set: &self.in_flight,
            id,
        };

        let profile = self.profiles.get_user(access_token).await.map_err(|e| {
            error!("Failed to log in user {} - osu! API error: {}", id, e);
            FinishError::ProfileLookupFailed(e)
        })?;

        let Some(request) = self.store.lookup(id) else {
            warn!("Failed to log in user {} - unknown verification id!", id);
            return Err(FinishError::UnknownRequest { id });
        };

        let member = self.gateway.member(request.discord_id).await.map_err(|e| {
            error!(
                "User {} not found in guild {}: {}",
                request.discord_id, self.config.guild_id, e
            );
            FinishError::MemberResolutionFailed {
                discord_id: request.discord_id.to_string(),
                reason: e.to_string(),
            }
        })?;

        let assignment = self
            .role_manager
            .grant_verification_roles(member.id, &profile)
            .await;

        if member.display_name != profile.username {
            match self.gateway.set_nickname(member.id, &profile.username).await {
                Ok(()) => info!("Renamed user {} (osu id: {})", member.id, profile.id),
                Err(e) => warn!(
                    "Failed to modify user {} (osu id: {}): {}",
                    member.id, profile.id, e
                ),
            }
        }

        // Name and roles changed, announce the fresh state
        let member = match self.gateway.member(member.id).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                warn!("Failed to refresh member {}: {}", member.id, e);
                member
            }
        };

        let announcement = messages::build_announcement(
            &profile,
            &member,
            &request,
            assignment.announced_roles(),
        );
        let channel_id = if request.onion {
            self.config.onion_verified_channel()
        } else {
            self.config.verified_channel()
        };

        self.gateway
            .post_announcement(channel_id, &announcement)
            .await
            .map_err(|e| match e {
                BotError::ChannelNotFound { id: channel } => {
                    error!("Announcement channel {} not found!", channel);
                    FinishError::AnnouncementChannelMissing { channel_id: channel }
                }
                other => {
                    error!("Failed to announce verification {}: {}", id, other);
                    FinishError::AnnouncementFailed(other)
                }
            })?;

        if request.onion {
            info!(
                "Sent onion application for user {} (osu id: {})",
                member.id, profile.id
            );
        } else {
            info!(
                "Sent verification for user {} (osu id: {})",
                member.id, profile.id
            );
        }

        self.store.remove(id);
        info!("User {} (id: {}) verified!", profile.id, id);
        Ok(())
    }
}

/// Shared verification manager type
pub type SharedVerificationManager = Arc<VerificationManager>;

pub fn create_shared_verification_manager(
    store: SharedVerificationStore,
    profiles: Arc<dyn ProfileProvider>,
    gateway: SharedGuildGateway,
    role_manager: SharedRoleManager,
    config: Arc<BotConfig>,
) -> SharedVerificationManager {
    Arc::new(VerificationManager::new(
        store,
        profiles,
        gateway,
        role_manager,
        config,
    ))
}
