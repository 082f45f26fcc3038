use async_trait::async_trait;
use poise::serenity_prelude::{
    self as serenity, ChannelId, CreateMessage, GuildId, Http, RoleId, UserId,
};
use std::sync::Arc;
use tracing::{debug, info};

use super::gateway::{GuildGateway, MemberSnapshot};
use crate::error::{BotError, Result};
use crate::messages::{self, Announcement};

const AUDIT_REASON: &str = "osu! verification";

/// Discord JSON error code for "Unknown Channel"
const UNKNOWN_CHANNEL_CODE: i64 = 10003;

fn is_unknown_channel_response(status: u16, code: i64) -> bool {
    status == 404 || code == UNKNOWN_CHANNEL_CODE
}

/// Whether a channel fetch failed because the channel does not exist.
/// Transport errors and rate limits are not.
fn is_unknown_channel(err: &serenity::Error) -> bool {
    match err {
        serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response)) => {
            is_unknown_channel_response(response.status_code.as_u16(), response.error.code as i64)
        }
        _ => false,
    }
}

/// `GuildGateway` backed by the Discord REST API
pub struct SerenityGateway {
    http: Arc<Http>,
    guild_id: GuildId,
}

impl SerenityGateway {
    pub fn new(http: Arc<Http>, guild_id: GuildId) -> Self {
        Self { http, guild_id }
    }
}

#[async_trait]
impl GuildGateway for SerenityGateway {
    async fn member(&self, discord_id: UserId) -> Result<MemberSnapshot> {
        let member = self.guild_id.member(&self.http, discord_id).await?;
        Ok(MemberSnapshot::from(&member))
    }

    async fn add_role(&self, discord_id: UserId, role_id: RoleId) -> Result<()> {
        self.http
            .add_member_role(self.guild_id, discord_id, role_id, Some(AUDIT_REASON))
            .await?;
        debug!("Added role {} to user {}", role_id, discord_id);
        Ok(())
    }

    async fn remove_role(&self, discord_id: UserId, role_id: RoleId) -> Result<()> {
        self.http
            .remove_member_role(self.guild_id, discord_id, role_id, Some(AUDIT_REASON))
            .await?;
        debug!("Removed role {} from user {}", role_id, discord_id);
        Ok(())
    }

    async fn set_nickname(&self, discord_id: UserId, nickname: &str) -> Result<()> {
        self.guild_id
            .edit_member(
                &self.http,
                discord_id,
                serenity::EditMember::new().nickname(nickname),
            )
            .await?;
        info!("Set nickname for {} to '{}'", discord_id, nickname);
        Ok(())
    }

    async fn post_announcement(
        &self,
        channel_id: ChannelId,
        announcement: &Announcement,
    ) -> Result<()> {
        let not_found = || BotError::ChannelNotFound {
            id: channel_id.to_string(),
        };

        let channel = channel_id
            .to_channel(&self.http)
            .await
            .map_err(|e| {
                if is_unknown_channel(&e) {
                    not_found()
                } else {
                    BotError::from(e)
                }
            })?
            .guild()
            .filter(|c| c.guild_id == self.guild_id)
            .ok_or_else(not_found)?;

        let mut message = CreateMessage::new().embed(messages::announcement_embed(announcement));
        if let Some(action) = &announcement.action {
            message = message.components(vec![messages::onion_action_row(action)]);
        }

        channel.send_message(&self.http, message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_channel_response() {
        assert!(is_unknown_channel_response(404, 10003));
        assert!(is_unknown_channel_response(404, 0));
        assert!(!is_unknown_channel_response(429, 0));
        assert!(!is_unknown_channel_response(500, 0));
        assert!(!is_unknown_channel_response(403, 50001));
    }

    #[test]
    fn test_non_http_error_is_not_missing_channel() {
        let err = serenity::Error::Other("connection reset");
        assert!(!is_unknown_channel(&err));
        assert!(matches!(BotError::from(err), BotError::Discord { .. }));
    }
}
