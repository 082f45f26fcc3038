// src/messages.rs
//
// User-facing text, embeds and component ids.

use poise::serenity_prelude::{
    ButtonStyle, Colour, CreateActionRow, CreateButton, CreateEmbed, CreateEmbedAuthor,
    CreateInputText, CreateMessage, CreateModal, InputTextStyle, Mentionable, MessageFlags,
    RoleId, Timestamp, User, UserId,
};
use uuid::Uuid;

use crate::guild::MemberSnapshot;
use crate::integrations::{OsuUser, Ruleset, UserStatistics};
use crate::state::VerificationRequest;

pub const VERIFY_ID: &str = "verify";
pub const VERIFY_APPLY_ONION_ID: &str = "verify-apply-onion";
pub const ONION_MODAL_ID: &str = "onion-application-modal";
pub const ONION_MODAL_TEXT_ID: &str = "onion-application-modal-text";

const ADD_ONION_PREFIX: &str = "add-onion-";
const REMOVE_ONION_PREFIX: &str = "remove-onion-";

pub const BLUE: Colour = Colour::new(0x3498DB);
const GREEN: Colour = Colour::new(0x2ECC71);
const RED: Colour = Colour::new(0xE74C3C);
const PROMPT: Colour = Colour::new(0xB70F75);

pub const ALREADY_VERIFIED: &str = "You are already verified!";
pub const ALREADY_APPLIED: &str = "You already applied!";
pub const ALREADY_ONION: &str =
    "You are already onion! If you think you need to reapply anyway - ping any of the @mod's";
pub const ONION_DISABLED: &str = "Onion applications are temporary disabled!";
pub const APPLICATION_EMPTY: &str = "Your onion application is empty";
pub const APPLICATION_TOO_SHORT: &str = "Your onion application is too short";
pub const ADD_ONION_FAILED: &str = "Couldn't add onion!";
pub const REMOVE_ONION_FAILED: &str = "Couldn't remove onion!";
pub const VERIFICATION_FAILED: &str = "Verification failed, please try again later.";
pub const ONION_MESSAGE_NOT_UPDATED: &str =
    "Onion was updated, but the announcement couldn't be edited.";

/// Button and custom-id actions the bot dispatches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentAction {
    Verify,
    VerifyApplyOnion,
    AddOnion { osu_id: u64, discord_id: UserId },
    RemoveOnion { osu_id: u64, discord_id: UserId },
}

impl ComponentAction {
    pub fn parse(custom_id: &str) -> Option<Self> {
        match custom_id {
            VERIFY_ID => return Some(Self::Verify),
            VERIFY_APPLY_ONION_ID => return Some(Self::VerifyApplyOnion),
            _ => {}
        }

        if let Some(rest) = custom_id.strip_prefix(ADD_ONION_PREFIX) {
            let (osu_id, discord_id) = parse_onion_ids(rest)?;
            return Some(Self::AddOnion { osu_id, discord_id });
        }
        if let Some(rest) = custom_id.strip_prefix(REMOVE_ONION_PREFIX) {
            let (osu_id, discord_id) = parse_onion_ids(rest)?;
            return Some(Self::RemoveOnion { osu_id, discord_id });
        }
        None
    }

    pub fn custom_id(&self) -> String {
        match self {
            Self::Verify => VERIFY_ID.to_string(),
            Self::VerifyApplyOnion => VERIFY_APPLY_ONION_ID.to_string(),
            Self::AddOnion { osu_id, discord_id } => {
                format!("{}{}-{}", ADD_ONION_PREFIX, osu_id, discord_id)
            }
            Self::RemoveOnion { osu_id, discord_id } => {
                format!("{}{}-{}", REMOVE_ONION_PREFIX, osu_id, discord_id)
            }
        }
    }

    /// Ephemeral reply sent when handling this action fails
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::Verify | Self::VerifyApplyOnion => VERIFICATION_FAILED,
            Self::AddOnion { .. } => ADD_ONION_FAILED,
            Self::RemoveOnion { .. } => REMOVE_ONION_FAILED,
        }
    }

    /// The button that undoes this onion action
    pub fn toggled(&self) -> Self {
        match *self {
            Self::AddOnion { osu_id, discord_id } => Self::RemoveOnion { osu_id, discord_id },
            Self::RemoveOnion { osu_id, discord_id } => Self::AddOnion { osu_id, discord_id },
            other => other,
        }
    }
}

fn parse_onion_ids(rest: &str) -> Option<(u64, UserId)> {
    let (osu_id, discord_id) = rest.split_once('-')?;
    let osu_id = osu_id.parse().ok()?;
    let discord_id: u64 = discord_id.parse().ok()?;
    if discord_id == 0 {
        return None;
    }
    Some((osu_id, UserId::new(discord_id)))
}

pub fn action_button(action: &ComponentAction) -> CreateButton {
    let (label, style) = match action {
        ComponentAction::Verify => ("Verify", ButtonStyle::Success),
        ComponentAction::VerifyApplyOnion => ("Verify and apply for Onion", ButtonStyle::Primary),
        ComponentAction::AddOnion { .. } => ("Add onion", ButtonStyle::Success),
        ComponentAction::RemoveOnion { .. } => ("Remove onion", ButtonStyle::Danger),
    };
    CreateButton::new(action.custom_id()).label(label).style(style)
}

pub fn onion_action_row(action: &ComponentAction) -> CreateActionRow {
    CreateActionRow::Buttons(vec![action_button(action)])
}

/// Rendered verification announcement
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub author_name: String,
    pub author_icon_url: String,
    pub profile_url: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub action: Option<ComponentAction>,
}

pub fn build_announcement(
    profile: &OsuUser,
    member: &MemberSnapshot,
    request: &VerificationRequest,
    added_roles: &[RoleId],
) -> Announcement {
    let mut description = format!("**Discord**: {}\n\n", member.id.mention());

    if request.onion {
        description.push_str(&format!(
            "**Onion application**: ```{}```\n",
            request.onion_application.as_deref().unwrap_or_default()
        ));
    }

    // Display order differs from grant order
    for (emoji, ruleset) in [
        ("<:osu:1266724120490541150>", Ruleset::Osu),
        ("<:taiko:1266724145484529705>", Ruleset::Taiko),
        ("<:mania:1266724133337698324>", Ruleset::Mania),
        ("<:catch:1266724102274682951>", Ruleset::Catch),
    ] {
        description.push_str(&format!(
            "{} {}\n",
            emoji,
            ruleset_line(&profile.statistics_for(ruleset))
        ));
    }
    description.push('\n');

    if added_roles.is_empty() {
        description.push_str("No new roles added!");
    } else {
        let mentions: Vec<String> = added_roles.iter().map(|r| r.mention().to_string()).collect();
        description.push_str(&format!("**Added roles**: {}", mentions.join(" ")));
    }

    Announcement {
        author_name: format!("{} (⭐ {})", profile.username, profile.playmode),
        author_icon_url: profile.avatar_url.clone(),
        profile_url: profile.profile_url(),
        title: format!("✅ {} has been verified!", member.username),
        description,
        thumbnail_url: member.avatar_url.clone(),
        action: request.onion.then_some(ComponentAction::AddOnion {
            osu_id: profile.id,
            discord_id: member.id,
        }),
    }
}

pub fn ruleset_line(stats: &UserStatistics) -> String {
    let rank = match stats.global_rank {
        Some(rank) if stats.has_rank && rank != 0 => rank.to_string(),
        _ => "—".to_string(),
    };
    format!(
        "#{}\t({}pp, \t{} playcount)",
        rank,
        format_thousands(stats.pp),
        stats.play_count
    )
}

/// Round to an integer and group digits with commas
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if rounded < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

pub fn announcement_embed(announcement: &Announcement) -> CreateEmbed {
    CreateEmbed::new()
        .author(
            CreateEmbedAuthor::new(&announcement.author_name)
                .icon_url(&announcement.author_icon_url)
                .url(&announcement.profile_url),
        )
        .title(&announcement.title)
        .url(&announcement.profile_url)
        .description(&announcement.description)
        .thumbnail(&announcement.thumbnail_url)
        .colour(BLUE)
}

/// Audit line appended to an onion application after a moderator acts on it
pub fn audit_embed(actor: &User, line: &str, success: bool) -> CreateEmbed {
    CreateEmbed::new()
        .author(CreateEmbedAuthor::new(&actor.name).icon_url(actor.face()))
        .description(line)
        .colour(if success { GREEN } else { RED })
        .timestamp(Timestamp::now())
}

pub fn audit_line(action: &ComponentAction, success: bool) -> &'static str {
    match (action, success) {
        (ComponentAction::AddOnion { .. }, true) => "Added onion",
        (ComponentAction::AddOnion { .. }, false) => "Failed to add onion",
        (ComponentAction::RemoveOnion { .. }, true) => "Removed onion",
        (ComponentAction::RemoveOnion { .. }, false) => "Failed to remove onion",
        _ => "",
    }
}

/// The message carrying the "Verify" buttons in the application channel
pub fn verification_prompt(verify_message: &str) -> CreateMessage {
    let embed = CreateEmbed::new()
        .title("Verification")
        .description(verify_message)
        .colour(PROMPT);

    CreateMessage::new()
        .embed(embed)
        .components(vec![CreateActionRow::Buttons(vec![
            action_button(&ComponentAction::Verify),
            action_button(&ComponentAction::VerifyApplyOnion),
        ])])
        .flags(MessageFlags::SUPPRESS_NOTIFICATIONS)
}

pub fn verify_link(base_url: &str, id: Uuid) -> String {
    format!("{}/start/{}", base_url.trim_end_matches('/'), id)
}

pub fn verify_link_embed(base_url: &str, id: Uuid) -> CreateEmbed {
    CreateEmbed::new()
        .title("Click here to verify your osu! account!")
        .url(verify_link(base_url, id))
        .colour(BLUE)
}

pub fn onion_application_modal() -> CreateModal {
    let text = CreateInputText::new(
        InputTextStyle::Paragraph,
        "What you'd be most interested in",
        ONION_MODAL_TEXT_ID,
    )
    .placeholder("speed / jump aim / tech / idk")
    .required(true);

    CreateModal::new(ONION_MODAL_ID, "Onion application")
        .components(vec![CreateActionRow::InputText(text)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile() -> OsuUser {
        serde_json::from_str(
            r#"{
                "id": 77,
                "username": "peppy",
                "playmode": "osu",
                "avatar_url": "https://a.ppy.sh/77",
                "statistics_rulesets": {
                    "osu": { "play_count": 1200, "pp": 4567.4, "global_rank": 5, "is_ranked": true },
                    "mania": { "play_count": 3, "pp": 0.0, "global_rank": null, "is_ranked": false }
                }
            }"#,
        )
        .unwrap()
    }

    fn member() -> MemberSnapshot {
        MemberSnapshot {
            id: UserId::new(42),
            username: "discorduser".to_string(),
            display_name: "discorduser".to_string(),
            avatar_url: "https://cdn.discordapp.com/avatar.png".to_string(),
            roles: vec![],
        }
    }

    fn request(onion: bool) -> VerificationRequest {
        VerificationRequest {
            id: Uuid::new_v4(),
            discord_id: UserId::new(42),
            onion,
            onion_application: onion.then(|| "speed and tech maps".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_parse_custom_ids() {
        assert_eq!(ComponentAction::parse("verify"), Some(ComponentAction::Verify));
        assert_eq!(
            ComponentAction::parse("verify-apply-onion"),
            Some(ComponentAction::VerifyApplyOnion)
        );
        assert_eq!(
            ComponentAction::parse("add-onion-123-456"),
            Some(ComponentAction::AddOnion {
                osu_id: 123,
                discord_id: UserId::new(456)
            })
        );
        assert_eq!(
            ComponentAction::parse("remove-onion-123-456"),
            Some(ComponentAction::RemoveOnion {
                osu_id: 123,
                discord_id: UserId::new(456)
            })
        );
        assert_eq!(ComponentAction::parse("add-onion-123"), None);
        assert_eq!(ComponentAction::parse("add-onion-x-456"), None);
        assert_eq!(ComponentAction::parse("add-onion-1-0"), None);
        assert_eq!(ComponentAction::parse("something-else"), None);
    }

    #[test]
    fn test_toggled_custom_id() {
        let add = ComponentAction::AddOnion {
            osu_id: 9,
            discord_id: UserId::new(10),
        };
        assert_eq!(add.toggled().custom_id(), "remove-onion-9-10");
        assert_eq!(add.toggled().toggled(), add);
        assert_eq!(ComponentAction::Verify.toggled(), ComponentAction::Verify);
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.4), "999");
        assert_eq!(format_thousands(999.5), "1,000");
        assert_eq!(format_thousands(1234567.0), "1,234,567");
    }

    #[test]
    fn test_ruleset_line() {
        let ranked = UserStatistics {
            play_count: 1200,
            pp: 4567.4,
            global_rank: Some(5),
            has_rank: true,
        };
        assert_eq!(ruleset_line(&ranked), "#5\t(4,567pp, \t1200 playcount)");

        let unranked = UserStatistics {
            global_rank: Some(5),
            has_rank: false,
            ..Default::default()
        };
        assert_eq!(ruleset_line(&unranked), "#—\t(0pp, \t0 playcount)");
    }

    #[test]
    fn test_plain_announcement() {
        let roles = [RoleId::new(100), RoleId::new(200)];
        let announcement = build_announcement(&profile(), &member(), &request(false), &roles);

        assert_eq!(announcement.author_name, "peppy (⭐ osu)");
        assert_eq!(announcement.title, "✅ discorduser has been verified!");
        assert_eq!(announcement.profile_url, "https://osu.ppy.sh/users/77");
        assert!(announcement.description.starts_with("**Discord**: <@42>"));
        assert!(announcement.description.ends_with("**Added roles**: <@&100> <@&200>"));
        assert!(!announcement.description.contains("Onion application"));
        assert_eq!(announcement.action, None);
    }

    #[test]
    fn test_onion_announcement_without_roles() {
        let announcement = build_announcement(&profile(), &member(), &request(true), &[]);

        assert!(announcement
            .description
            .contains("**Onion application**: ```speed and tech maps```"));
        assert!(announcement.description.ends_with("No new roles added!"));
        assert_eq!(
            announcement.action,
            Some(ComponentAction::AddOnion {
                osu_id: 77,
                discord_id: UserId::new(42)
            })
        );
    }

    #[test]
    fn test_verify_link() {
        let id = Uuid::nil();
        assert_eq!(
            verify_link("https://verify.example/", id),
            "https://verify.example/start/00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_failure_message_per_action() {
        let add = ComponentAction::AddOnion {
            osu_id: 1,
            discord_id: UserId::new(2),
        };
        assert_eq!(ComponentAction::Verify.failure_message(), VERIFICATION_FAILED);
        assert_eq!(
            ComponentAction::VerifyApplyOnion.failure_message(),
            VERIFICATION_FAILED
        );
        assert_eq!(add.failure_message(), ADD_ONION_FAILED);
        assert_eq!(add.toggled().failure_message(), REMOVE_ONION_FAILED);
    }
}
