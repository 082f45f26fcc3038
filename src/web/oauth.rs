//! osu! OAuth client settings and token exchange types

use serde::Deserialize;
use uuid::Uuid;

pub const OSU_AUTHORIZE_URL: &str = "https://osu.ppy.sh/oauth/authorize";
pub const OSU_TOKEN_URL: &str = "https://osu.ppy.sh/oauth/token";

/// OAuth configuration
#[derive(Clone)]
pub struct OsuOAuthState {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
    pub http_client: reqwest::Client,
}

impl OsuOAuthState {
    pub fn from_env(http_client: reqwest::Client) -> Option<Self> {
        let client_id = std::env::var("OSU_CLIENT_ID").ok()?;
        let client_secret = std::env::var("OSU_CLIENT_SECRET").ok()?;
        let base_url = std::env::var("WEB_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3001".to_string());

        Some(Self {
            client_id,
            client_secret,
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn redirect_uri(&self) -> String {
        format!("{}/callback", self.base_url)
    }

    /// Where `/start/{id}` sends the user; the request id travels in `state`
    pub fn authorize_url(&self, id: Uuid) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope=public&state={}",
            OSU_AUTHORIZE_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri()),
            id
        )
    }
}

/// osu! OAuth token response
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
}
