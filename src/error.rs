use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Failed to load config file '{path}': {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    // Verification errors
    #[error("Verification pending for user: {discord_id} (onion: {onion})")]
    VerificationPending { discord_id: String, onion: bool },

    // Discord errors
    #[error("Discord API error: {message}")]
    Discord { message: String },

    #[error("Channel not found: {id}")]
    ChannelNotFound { id: String },

    #[error("Guild not found: {id}")]
    GuildNotFound { id: String },

    // Integration errors
    #[error("osu! API error: {message}")]
    ProfileApi { message: String },

    #[error("Membership registry error: {message}")]
    Registry { message: String },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        BotError::Discord {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for BotError {
    fn from(err: std::io::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

/// Terminal outcomes of `VerificationManager::finish`.
///
/// Every variant except `UnknownRequest` leaves the pending request in the
/// store so the same link can be retried.
#[derive(Error, Debug)]
pub enum FinishError {
    #[error("profile lookup failed: {0}")]
    ProfileLookupFailed(#[source] BotError),

    #[error("unknown verification request {id}")]
    UnknownRequest { id: uuid::Uuid },

    #[error("verification request {id} is already being finished")]
    AlreadyInProgress { id: uuid::Uuid },

    #[error("could not resolve guild member {discord_id}: {reason}")]
    MemberResolutionFailed { discord_id: String, reason: String },

    #[error("announcement channel {channel_id} is missing")]
    AnnouncementChannelMissing { channel_id: String },

    #[error("failed to post announcement: {0}")]
    AnnouncementFailed(#[source] BotError),
}

/// Failures of the onion toggle.
#[derive(Error, Debug)]
pub enum OnionError {
    /// The registry refused or timed out; no role was touched.
    #[error("membership registry call failed: {0}")]
    RegistryCallFailed(#[source] BotError),

    /// The registry accepted the change but the Discord role update failed.
    #[error("onion role update failed: {0}")]
    RoleMutationFailed(#[source] BotError),
}

use poise::serenity_prelude as serenity;
