use poise::serenity_prelude::UserId;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::BotConfig;
use crate::error::OnionError;
use crate::guild::{MemberSnapshot, SharedGuildGateway};
use crate::integrations::MembershipRegistry;
use crate::managers::SharedVerificationManager;
use crate::messages;

/// Applications shorter than this are rejected
pub const MIN_APPLICATION_WORDS: usize = 3;

/// Why an onion application was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationRefusal {
    Disabled,
    AlreadyApplied,
    AlreadyOnion,
    Empty,
    TooShort,
}

impl ApplicationRefusal {
    /// Ephemeral reply shown to the applicant
    pub fn message(&self) -> &'static str {
        match self {
            Self::Disabled => messages::ONION_DISABLED,
            Self::AlreadyApplied => messages::ALREADY_APPLIED,
            Self::AlreadyOnion => messages::ALREADY_ONION,
            Self::Empty => messages::APPLICATION_EMPTY,
            Self::TooShort => messages::APPLICATION_TOO_SHORT,
        }
    }
}

/// Check the free text of an application
pub fn validate_application_text(text: Option<&str>) -> Result<&str, ApplicationRefusal> {
    let text = text.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(ApplicationRefusal::Empty);
    }
    if text.split_whitespace().count() < MIN_APPLICATION_WORDS {
        return Err(ApplicationRefusal::TooShort);
    }
    Ok(text)
}

/// Onion applications and the moderator add/remove toggle
pub struct OnionManager {
    registry: Arc<dyn MembershipRegistry>,
    gateway: SharedGuildGateway,
    verification_manager: SharedVerificationManager,
    config: Arc<BotConfig>,
}

impl OnionManager {
    pub fn new(
        registry: Arc<dyn MembershipRegistry>,
        gateway: SharedGuildGateway,
        verification_manager: SharedVerificationManager,
        config: Arc<BotConfig>,
    ) -> Self {
        Self {
            registry,
            gateway,
            verification_manager,
            config,
        }
    }

    /// Whether a member may open the application form
    pub fn check_can_apply(&self, member: &MemberSnapshot) -> Result<(), ApplicationRefusal> {
        if self.config.disable_onion_application {
            return Err(ApplicationRefusal::Disabled);
        }
        if self.verification_manager.has_pending(member.id, true) {
            return Err(ApplicationRefusal::AlreadyApplied);
        }
        if member.has_role(self.config.onion_role()) {
            return Err(ApplicationRefusal::AlreadyOnion);
        }
        Ok(())
    }

    /// Validate the application text and open an onion verification request
    pub fn submit_application(
        &self,
        discord_id: UserId,
        text: Option<&str>,
    ) -> Result<Uuid, ApplicationRefusal> {
        let text = validate_application_text(text).map_err(|refusal| {
            warn!(
                "Rejected onion application from {} ({:?}): {:?}",
                discord_id, refusal, text
            );
            refusal
        })?;

        self.verification_manager
            .start(discord_id, true, Some(text.to_string()))
            .map_err(|_| ApplicationRefusal::AlreadyApplied)
    }

    /// Register the grant with the registry, then give the role.
    /// The role is only touched once the registry accepted the change.
    pub async fn apply_onion(&self, osu_id: u64, discord_id: UserId) -> Result<(), OnionError> {
        info!("Adding onion to user {} (osu id: {})...", discord_id, osu_id);

        self.registry
            .add_member(osu_id, discord_id)
            .await
            .map_err(|e| {
                error!("Failed to register onion for {}: {}", discord_id, e);
                OnionError::RegistryCallFailed(e)
            })?;

        self.gateway
            .add_role(discord_id, self.config.onion_role())
            .await
            .map_err(|e| {
                error!("Registered onion for {} but role grant failed: {}", discord_id, e);
                OnionError::RoleMutationFailed(e)
            })
    }

    /// Deregister, then revoke the role
    pub async fn remove_onion(&self, discord_id: UserId) -> Result<(), OnionError> {
        info!("Removing onion from user {}...", discord_id);

        self.registry.remove_member(discord_id).await.map_err(|e| {
            error!("Failed to deregister onion for {}: {}", discord_id, e);
            OnionError::RegistryCallFailed(e)
        })?;

        self.gateway
            .remove_role(discord_id, self.config.onion_role())
            .await
            .map_err(|e| {
                error!("Deregistered onion for {} but role removal failed: {}", discord_id, e);
                OnionError::RoleMutationFailed(e)
            })
    }
}

/// Shared onion manager type
pub type SharedOnionManager = Arc<OnionManager>;

pub fn create_shared_onion_manager(
    registry: Arc<dyn MembershipRegistry>,
    gateway: SharedGuildGateway,
    verification_manager: SharedVerificationManager,
    config: Arc<BotConfig>,
) -> SharedOnionManager {
    Arc::new(OnionManager::new(
        registry,
        gateway,
        verification_manager,
        config,
    ))
}
