use poise::serenity_prelude::{
    self as serenity, ActionRowComponent, ComponentInteraction, CreateEmbed,
    CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, EditInteractionResponse, Member, ModalInteraction, User,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::guild::MemberSnapshot;
use crate::messages::{self, ComponentAction, ONION_MODAL_ID, ONION_MODAL_TEXT_ID};
use crate::{Data, Error};

/// Route button clicks and modal submissions
pub async fn handle_interaction(
    ctx: &serenity::Context,
    interaction: &serenity::Interaction,
    data: &Data,
) -> Result<(), Error> {
    match interaction {
        serenity::Interaction::Component(component) => {
            info!(
                "Processing {} component interaction from {}...",
                component.data.custom_id, component.user.id
            );

            let Some(action) = ComponentAction::parse(&component.data.custom_id) else {
                info!(
                    "Unknown component interaction {}!",
                    component.data.custom_id
                );
                return Ok(());
            };

            let result = match action {
                ComponentAction::Verify => handle_verify(ctx, component, data).await,
                ComponentAction::VerifyApplyOnion => {
                    handle_apply_onion(ctx, component, data).await
                }
                _ => handle_onion_toggle(ctx, component, data, action).await,
            };

            if let Err(e) = result {
                error!(
                    "Failed to handle {} from {}: {}",
                    component.data.custom_id, component.user.id, e
                );
                report_failure(ctx, component, action.failure_message()).await;
            }
            Ok(())
        }
        serenity::Interaction::Modal(modal) => {
            info!(
                "Processing {} modal interaction from {}...",
                modal.data.custom_id, modal.user.id
            );

            if modal.data.custom_id == ONION_MODAL_ID {
                handle_onion_modal(ctx, modal, data).await
            } else {
                info!("Unknown modal interaction {}!", modal.data.custom_id);
                Ok(())
            }
        }
        // Slash commands are dispatched by poise
        _ => Ok(()),
    }
}

fn ephemeral(content: &str) -> CreateInteractionResponse {
    CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true),
    )
}

fn verify_link(data: &Data, id: Uuid) -> CreateInteractionResponse {
    CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .embed(messages::verify_link_embed(&data.web_base_url, id))
            .ephemeral(true),
    )
}

/// Tell the requester something went wrong, whether or not the click was deferred
async fn report_failure(ctx: &serenity::Context, interaction: &ComponentInteraction, content: &str) {
    let followup = interaction
        .create_followup(
            &ctx.http,
            CreateInteractionResponseFollowup::new()
                .content(content)
                .ephemeral(true),
        )
        .await;
    if followup.is_ok() {
        return;
    }

    if let Err(e) = interaction.create_response(&ctx.http, ephemeral(content)).await {
        warn!(
            "Couldn't report failure to {}: {}",
            interaction.user.id, e
        );
    }
}

/// The clicking member, from the interaction payload when Discord sent it
async fn resolve_member(
    member: Option<&Member>,
    user: &User,
    data: &Data,
) -> Result<MemberSnapshot, Error> {
    match member {
        Some(member) => Ok(MemberSnapshot::from(member)),
        None => Ok(data.gateway.member(user.id).await?),
    }
}

async fn handle_verify(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    interaction.defer_ephemeral(&ctx.http).await?;

    let member = resolve_member(interaction.member.as_ref(), &interaction.user, data).await?;

    let followup = if member.has_role(data.config.verified_role()) {
        CreateInteractionResponseFollowup::new().content(messages::ALREADY_VERIFIED)
    } else if data.verification_manager.has_pending(member.id, false) {
        CreateInteractionResponseFollowup::new().content(messages::ALREADY_APPLIED)
    } else {
        match data.verification_manager.start(member.id, false, None) {
            Ok(id) => CreateInteractionResponseFollowup::new()
                .embed(messages::verify_link_embed(&data.web_base_url, id)),
            // Lost a race with another click
            Err(e) => {
                debug!("Verification not started for {}: {}", member.id, e);
                CreateInteractionResponseFollowup::new().content(messages::ALREADY_APPLIED)
            }
        }
    };

    interaction
        .create_followup(&ctx.http, followup.ephemeral(true))
        .await?;
    Ok(())
}

async fn handle_apply_onion(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    let member = resolve_member(interaction.member.as_ref(), &interaction.user, data).await?;

    let response = match data.onion_manager.check_can_apply(&member) {
        Ok(()) => CreateInteractionResponse::Modal(messages::onion_application_modal()),
        Err(refusal) => ephemeral(refusal.message()),
    };
    interaction.create_response(&ctx.http, response).await?;
    Ok(())
}

fn modal_text(modal: &ModalInteraction) -> Option<&str> {
    modal
        .data
        .components
        .iter()
        .flat_map(|row| row.components.iter())
        .find_map(|component| match component {
            ActionRowComponent::InputText(input) if input.custom_id == ONION_MODAL_TEXT_ID => {
                input.value.as_deref()
            }
            _ => None,
        })
}

async fn handle_onion_modal(
    ctx: &serenity::Context,
    interaction: &ModalInteraction,
    data: &Data,
) -> Result<(), Error> {
    let response = match data
        .onion_manager
        .submit_application(interaction.user.id, modal_text(interaction))
    {
        Ok(id) => verify_link(data, id),
        Err(refusal) => ephemeral(refusal.message()),
    };
    interaction.create_response(&ctx.http, response).await?;
    Ok(())
}

/// Moderator "Add onion" / "Remove onion" button.
///
/// Registry calls can take seconds, so the click is acknowledged first.
async fn handle_onion_toggle(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    data: &Data,
    action: ComponentAction,
) -> Result<(), Error> {
    interaction.defer(&ctx.http).await?;

    let result = match action {
        ComponentAction::AddOnion { osu_id, discord_id } => {
            data.onion_manager.apply_onion(osu_id, discord_id).await
        }
        ComponentAction::RemoveOnion { discord_id, .. } => {
            data.onion_manager.remove_onion(discord_id).await
        }
        _ => return Ok(()),
    };

    let success = result.is_ok();
    let next = if success { action.toggled() } else { action };

    let mut embeds: Vec<CreateEmbed> = interaction
        .message
        .embeds
        .iter()
        .cloned()
        .map(CreateEmbed::from)
        .collect();
    embeds.push(messages::audit_embed(
        &interaction.user,
        messages::audit_line(&action, success),
        success,
    ));

    let edited = interaction
        .edit_response(
            &ctx.http,
            EditInteractionResponse::new()
                .embeds(embeds)
                .components(vec![messages::onion_action_row(&next)]),
        )
        .await;

    match (result, edited) {
        (Ok(()), Ok(_)) => {
            info!(
                "{} for {} by moderator {}",
                messages::audit_line(&action, true),
                action.custom_id(),
                interaction.user.id
            );
            Ok(())
        }
        (Ok(()), Err(e)) => {
            warn!(
                "{} applied but announcement edit failed: {}",
                action.custom_id(),
                e
            );
            interaction
                .create_followup(
                    &ctx.http,
                    CreateInteractionResponseFollowup::new()
                        .content(messages::ONION_MESSAGE_NOT_UPDATED)
                        .ephemeral(true),
                )
                .await?;
            Ok(())
        }
        (Err(e), _) => Err(e.into()),
    }
}
