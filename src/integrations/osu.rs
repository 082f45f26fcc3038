//! osu! API v2 profile lookup

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{BotError, Result};

const OSU_ME_URL: &str = "https://osu.ppy.sh/api/v2/me";

/// The four osu! game modes, in the order tier roles are granted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ruleset {
    Osu,
    Taiko,
    Catch,
    Mania,
}

impl Ruleset {
    pub const ALL: [Ruleset; 4] = [Ruleset::Osu, Ruleset::Taiko, Ruleset::Catch, Ruleset::Mania];
}

/// User returned by `/api/v2/me`
#[derive(Debug, Clone, Deserialize)]
pub struct OsuUser {
    pub id: u64,
    pub username: String,
    pub playmode: String,
    pub avatar_url: String,
    #[serde(rename = "statistics_rulesets", default)]
    pub statistics: RulesetStatistics,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesetStatistics {
    #[serde(default)]
    pub osu: Option<UserStatistics>,
    #[serde(default)]
    pub taiko: Option<UserStatistics>,
    #[serde(default)]
    pub fruits: Option<UserStatistics>,
    #[serde(default)]
    pub mania: Option<UserStatistics>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserStatistics {
    #[serde(default)]
    pub play_count: u64,
    #[serde(default)]
    pub pp: f64,
    #[serde(default)]
    pub global_rank: Option<u64>,
    #[serde(rename = "is_ranked", default)]
    pub has_rank: bool,
}

impl UserStatistics {
    /// Global rank as used for tier selection; unranked reads as 0
    pub fn rank_or_zero(&self) -> u64 {
        self.global_rank.unwrap_or(0)
    }
}

impl OsuUser {
    /// Statistics for a ruleset; missing rulesets read as empty statistics
    pub fn statistics_for(&self, ruleset: Ruleset) -> UserStatistics {
        let stats = match ruleset {
            Ruleset::Osu => &self.statistics.osu,
            Ruleset::Taiko => &self.statistics.taiko,
            Ruleset::Catch => &self.statistics.fruits,
            Ruleset::Mania => &self.statistics.mania,
        };
        stats.clone().unwrap_or_default()
    }

    pub fn profile_url(&self) -> String {
        format!("https://osu.ppy.sh/users/{}", self.id)
    }
}

/// Exchanges an OAuth access token for the owner's profile
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn get_user(&self, access_token: &str) -> Result<OsuUser>;
}

pub struct OsuApiProvider {
    http_client: reqwest::Client,
}

impl OsuApiProvider {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl ProfileProvider for OsuApiProvider {
    async fn get_user(&self, access_token: &str) -> Result<OsuUser> {
        let response = self
            .http_client
            .get(OSU_ME_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| BotError::ProfileApi {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::ProfileApi {
                message: format!("{} - {}", status, body),
            });
        }

        let user: OsuUser = response.json().await.map_err(|e| BotError::ProfileApi {
            message: format!("failed to parse user: {}", e),
        })?;

        debug!("Fetched osu! user {} ({})", user.username, user.id);
        Ok(user)
    }
}
