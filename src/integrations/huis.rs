//! Membership registry at pp.huismetbenen.nl, which tracks onion holders

use async_trait::async_trait;
use poise::serenity_prelude::UserId;
use reqwest::header::{HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::debug;

use crate::error::{BotError, Result};

/// Matches the interaction deadline Discord gives us
const REGISTRY_TIMEOUT: Duration = Duration::from_secs(3);

/// Records onion grants outside of Discord. Calls are never retried.
#[async_trait]
pub trait MembershipRegistry: Send + Sync {
    async fn add_member(&self, osu_id: u64, discord_id: UserId) -> Result<()>;
    async fn remove_member(&self, discord_id: UserId) -> Result<()>;
}

pub struct HuisApiProvider {
    base_url: String,
    http_client: reqwest::Client,
}

impl HuisApiProvider {
    pub fn new(base_url: &str, auth_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(auth_key).map_err(|e| BotError::ConfigValidation {
            message: format!("invalid HUIS_TOKEN: {}", e),
        })?;
        headers.insert("x-discord-bot-auth-key", key);

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REGISTRY_TIMEOUT)
            .build()
            .map_err(|e| BotError::Internal {
                message: format!("failed to build registry client: {}", e),
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    async fn check(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(BotError::Registry {
            message: format!("{} - {}", status, body),
        })
    }
}

fn transport_error(e: reqwest::Error) -> BotError {
    BotError::Registry {
        message: if e.is_timeout() {
            "request timed out".to_string()
        } else {
            e.to_string()
        },
    }
}

#[async_trait]
impl MembershipRegistry for HuisApiProvider {
    async fn add_member(&self, osu_id: u64, discord_id: UserId) -> Result<()> {
        let response = self
            .http_client
            .post(format!("{}/oauth/add-onion", self.base_url))
            .json(&serde_json::json!({
                "osu_id": osu_id,
                "discord_id": discord_id.get(),
            }))
            .send()
            .await
            .map_err(transport_error)?;

        Self::check(response).await?;
        debug!("Registered onion for {} (osu id: {})", discord_id, osu_id);
        Ok(())
    }

    async fn remove_member(&self, discord_id: UserId) -> Result<()> {
        let response = self
            .http_client
            .delete(format!("{}/oauth/remove-onion/{}", self.base_url, discord_id))
            .send()
            .await
            .map_err(transport_error)?;

        Self::check(response).await?;
        debug!("Deregistered onion for {}", discord_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_header_unsafe_token() {
        assert!(matches!(
            HuisApiProvider::new("https://example.org", "bad\nkey"),
            Err(BotError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_base_url_trimmed() {
        let provider = HuisApiProvider::new("https://example.org/", "key").unwrap();
        assert_eq!(provider.base_url, "https://example.org");
    }
}
