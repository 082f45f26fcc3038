use poise::serenity_prelude::{ChannelId, GuildId, RoleId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{BotError, Result};

/// Number of rank tiers per ruleset.
pub const TIER_COUNT: usize = 5;

fn default_pending_ttl_secs() -> u64 {
    3600
}

/// Bot configuration, loaded from `data/config.json` (or `CONFIG_PATH`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    pub guild_id: u64,

    /// Channel holding the "Verify" prompt
    pub application_channel_id: u64,

    /// Channel receiving plain verification announcements
    pub verified_channel_id: u64,

    /// Channel receiving onion applications for moderator review
    pub onion_verified_channel_id: u64,

    /// Text of the verification prompt embed
    pub verify_message: String,

    #[serde(default)]
    pub disable_onion_application: bool,

    /// How long an unfinished verification link stays valid
    #[serde(default = "default_pending_ttl_secs")]
    pub pending_ttl_secs: u64,

    pub roles: RolesConfig,
}

/// Role ids granted by the bot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RolesConfig {
    pub verified: u64,
    pub onion: u64,

    /// Tier roles, best rank first
    pub osu: [u64; TIER_COUNT],
    pub taiko: [u64; TIER_COUNT],
    pub catch: [u64; TIER_COUNT],
    pub mania: [u64; TIER_COUNT],
}

impl BotConfig {
    /// Load from a JSON file and validate
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BotError::ConfigLoad {
            path: path.to_string(),
            source: e,
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|e| BotError::ConfigParse {
            path: path.to_string(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let ids = [
            ("guild_id", self.guild_id),
            ("application_channel_id", self.application_channel_id),
            ("verified_channel_id", self.verified_channel_id),
            ("onion_verified_channel_id", self.onion_verified_channel_id),
            ("roles.verified", self.roles.verified),
            ("roles.onion", self.roles.onion),
        ];
        for (name, id) in ids {
            if id == 0 {
                return Err(BotError::ConfigValidation {
                    message: format!("{} must be a non-zero snowflake", name),
                });
            }
        }

        for (name, tiers) in [
            ("osu", &self.roles.osu),
            ("taiko", &self.roles.taiko),
            ("catch", &self.roles.catch),
            ("mania", &self.roles.mania),
        ] {
            if tiers.contains(&0) {
                return Err(BotError::ConfigValidation {
                    message: format!("roles.{} contains a zero role id", name),
                });
            }
            let unique: HashSet<&u64> = tiers.iter().collect();
            if unique.len() != TIER_COUNT {
                return Err(BotError::ConfigValidation {
                    message: format!("roles.{} contains duplicate role ids", name),
                });
            }
        }

        Ok(())
    }

    pub fn guild_id(&self) -> GuildId {
        GuildId::new(self.guild_id)
    }

    pub fn application_channel(&self) -> ChannelId {
        ChannelId::new(self.application_channel_id)
    }

    pub fn verified_channel(&self) -> ChannelId {
        ChannelId::new(self.verified_channel_id)
    }

    pub fn onion_verified_channel(&self) -> ChannelId {
        ChannelId::new(self.onion_verified_channel_id)
    }

    pub fn verified_role(&self) -> RoleId {
        RoleId::new(self.roles.verified)
    }

    pub fn onion_role(&self) -> RoleId {
        RoleId::new(self.roles.onion)
    }

    pub fn pending_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.pending_ttl_secs)
    }
}

impl RolesConfig {
    pub fn osu_tiers(&self) -> [RoleId; TIER_COUNT] {
        self.osu.map(RoleId::new)
    }

    pub fn taiko_tiers(&self) -> [RoleId; TIER_COUNT] {
        self.taiko.map(RoleId::new)
    }

    pub fn catch_tiers(&self) -> [RoleId; TIER_COUNT] {
        self.catch.map(RoleId::new)
    }

    pub fn mania_tiers(&self) -> [RoleId; TIER_COUNT] {
        self.mania.map(RoleId::new)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> BotConfig {
    BotConfig {
        guild_id: 1,
        application_channel_id: 10,
        verified_channel_id: 11,
        onion_verified_channel_id: 12,
        verify_message: "Link your osu! account".to_string(),
        disable_onion_application: false,
        pending_ttl_secs: 3600,
        roles: RolesConfig {
            verified: 100,
            onion: 101,
            osu: [200, 201, 202, 203, 204],
            taiko: [300, 301, 302, 303, 304],
            catch: [400, 401, 402, 403, 404],
            mania: [500, 501, 502, 503, 504],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "guild_id": 1,
        "application_channel_id": 10,
        "verified_channel_id": 11,
        "onion_verified_channel_id": 12,
        "verify_message": "Click below",
        "roles": {
            "verified": 100,
            "onion": 101,
            "osu": [200, 201, 202, 203, 204],
            "taiko": [300, 301, 302, 303, 304],
            "catch": [400, 401, 402, 403, 404],
            "mania": [500, 501, 502, 503, 504]
        }
    }"#;

    #[test]
    fn test_parse_config_with_defaults() {
        let config: BotConfig = serde_json::from_str(SAMPLE).unwrap();
        assert!(config.validate().is_ok());
        assert!(!config.disable_onion_application);
        assert_eq!(config.pending_ttl_secs, 3600);
        assert_eq!(config.roles.mania_tiers()[4], RoleId::new(504));
        assert_eq!(config.onion_verified_channel(), ChannelId::new(12));
    }

    #[test]
    fn test_wrong_tier_count_is_a_parse_error() {
        let json = SAMPLE.replace("[200, 201, 202, 203, 204]", "[200, 201, 202, 203]");
        assert!(serde_json::from_str::<BotConfig>(&json).is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let json = SAMPLE.replace("\"guild_id\": 1,", "\"guild_id\": 1, \"extra\": true,");
        assert!(serde_json::from_str::<BotConfig>(&json).is_err());
    }

    #[test]
    fn test_validation_rejects_duplicates_and_zero() {
        let mut config = test_config();
        config.roles.taiko = [300, 300, 302, 303, 304];
        assert!(matches!(
            config.validate(),
            Err(BotError::ConfigValidation { .. })
        ));

        let mut config = test_config();
        config.verified_channel_id = 0;
        assert!(matches!(
            config.validate(),
            Err(BotError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = BotConfig::load_from_file("/nonexistent/config.json");
        assert!(matches!(result, Err(BotError::ConfigLoad { .. })));
    }
}
