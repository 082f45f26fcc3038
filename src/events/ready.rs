use poise::serenity_prelude::{GetMessages, Http, UserId};
use tracing::{debug, info};

use crate::config::BotConfig;
use crate::error::{BotError, Result};
use crate::messages;

/// Make sure the application channel carries the "Verify" buttons
pub async fn ensure_verification_prompt(
    http: &Http,
    config: &BotConfig,
    bot_id: UserId,
) -> Result<()> {
    let guild_id = config.guild_id();
    http.get_guild(guild_id)
        .await
        .map_err(|_| BotError::GuildNotFound {
            id: guild_id.to_string(),
        })?;

    let channel_id = config.application_channel();
    let recent = channel_id
        .messages(http, GetMessages::new().limit(50))
        .await
        .map_err(|_| BotError::ChannelNotFound {
            id: channel_id.to_string(),
        })?;

    if recent
        .iter()
        .any(|m| m.author.id == bot_id && !m.components.is_empty())
    {
        debug!("Verify message already present in {}", channel_id);
        return Ok(());
    }

    info!("Verify message wasn't found, sending one...");
    channel_id
        .send_message(http, messages::verification_prompt(&config.verify_message))
        .await?;

    Ok(())
}
