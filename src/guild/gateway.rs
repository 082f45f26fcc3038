use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, Member, RoleId, UserId};

use crate::error::Result;
use crate::messages::Announcement;

/// The parts of a guild member the verification flow reads
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSnapshot {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub avatar_url: String,
    pub roles: Vec<RoleId>,
}

impl From<&Member> for MemberSnapshot {
    fn from(member: &Member) -> Self {
        Self {
            id: member.user.id,
            username: member.user.name.clone(),
            display_name: member.display_name().to_string(),
            avatar_url: member.user.face(),
            roles: member.roles.clone(),
        }
    }
}

impl MemberSnapshot {
    pub fn has_role(&self, role_id: RoleId) -> bool {
        self.roles.contains(&role_id)
    }
}

/// Guild operations used by the verification and onion flows.
///
/// Bound to the configured guild; implementations never hold locks across
/// the underlying API calls.
#[async_trait]
pub trait GuildGateway: Send + Sync {
    /// Fetch a member of the configured guild
    async fn member(&self, discord_id: UserId) -> Result<MemberSnapshot>;

    async fn add_role(&self, discord_id: UserId, role_id: RoleId) -> Result<()>;

    async fn remove_role(&self, discord_id: UserId, role_id: RoleId) -> Result<()>;

    async fn set_nickname(&self, discord_id: UserId, nickname: &str) -> Result<()>;

    /// Post to a text channel of the guild.
    /// Fails with `BotError::ChannelNotFound` if the channel cannot be resolved.
    async fn post_announcement(&self, channel_id: ChannelId, announcement: &Announcement)
        -> Result<()>;
}
