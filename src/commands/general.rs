use poise::serenity_prelude as serenity;
use tracing::info;

use crate::messages::BLUE;
use crate::{Context, Error};

/// Check if the bot is running
#[poise::command(prefix_command, slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    info!("Ping command called by {}", ctx.author().name);
    ctx.send(
        poise::CreateReply::default()
            .content("Pong! Bot is working!")
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Explain how verification works
#[poise::command(prefix_command, slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let channel = ctx.data().config.application_channel();

    let embed = serenity::CreateEmbed::new()
        .title("osu! verification")
        .description(format!(
            "Press **Verify** in <#{}> and log in with your osu! account to get your rank roles.",
            channel
        ))
        .field(
            "Verify and apply for Onion",
            "Verifies you and sends a short application to the moderators.",
            false,
        )
        .field("/ping", "Check if the bot is running", false)
        .color(BLUE);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
