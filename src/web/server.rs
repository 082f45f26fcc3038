//! Web server implementation for osu! OAuth verification

use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
    routing::get,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use serde::Deserialize;
use std::{net::SocketAddr, path::PathBuf};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::oauth::{OsuOAuthState, TokenResponse, OSU_TOKEN_URL};
use crate::managers::SharedVerificationManager;

/// Web server configuration
pub struct WebServerConfig {
    pub port: u16,
    /// PEM certificate chain, only used together with `key_path`
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            cert_path: None,
            key_path: None,
        }
    }
}

impl WebServerConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3001),
            cert_path: std::env::var("TLS_CERT_PATH").ok().map(PathBuf::from),
            key_path: std::env::var("TLS_KEY_PATH").ok().map(PathBuf::from),
        }
    }

    /// Both TLS files, when configured and present on disk
    pub fn tls_paths(&self) -> Option<(&PathBuf, &PathBuf)> {
        match (&self.cert_path, &self.key_path) {
            (Some(cert), Some(key)) if cert.exists() && key.exists() => Some((cert, key)),
            _ => None,
        }
    }
}

/// Shared state for web handlers
#[derive(Clone)]
pub struct AppState {
    pub oauth: OsuOAuthState,
    pub verification_manager: SharedVerificationManager,
}

/// Query parameters from the osu! OAuth callback
#[derive(Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    /// The verification request id
    state: Option<String>,
}

/// Failure categories shown on the error page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyPageError {
    MissingId,
    FailedLogin,
    MissingToken,
    FailedVerification,
}

impl VerifyPageError {
    pub fn key(&self) -> &'static str {
        match self {
            VerifyPageError::MissingId => "missing-id",
            VerifyPageError::FailedLogin => "failed-login",
            VerifyPageError::MissingToken => "missing-token",
            VerifyPageError::FailedVerification => "failed-verification",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            VerifyPageError::MissingId => {
                "This verification link is invalid or has expired. Press Verify in Discord again."
            }
            VerifyPageError::FailedLogin => "Logging in with osu! failed.",
            VerifyPageError::MissingToken => "osu! did not return an access token.",
            VerifyPageError::FailedVerification => {
                "We couldn't finish your verification. Please try again later."
            }
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/robots.txt", get(robots))
        .route("/start/:id", get(start))
        .route("/callback", get(oauth_callback))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the web server for OAuth verification
pub async fn start_web_server(
    config: WebServerConfig,
    oauth: OsuOAuthState,
    verification_manager: SharedVerificationManager,
) -> anyhow::Result<()> {
    let base_url = oauth.base_url.clone();
    let app = app(AppState {
        oauth,
        verification_manager,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("=== osu! OAuth Configuration ===");
    info!("Callback URL for the osu! OAuth application: {}/callback", base_url);

    match config.tls_paths() {
        Some((cert_path, key_path)) => {
            info!("Loading TLS certificates:");
            info!("  Certificate: {}", cert_path.display());
            info!("  Private key: {}", key_path.display());

            let tls_config = RustlsConfig::from_pem_file(cert_path, key_path)
                .await
                .map_err(|e| {
                    anyhow::anyhow!(
                        "Failed to load TLS certificates: {}\n  Certificate: {}\n  Private key: {}",
                        e,
                        cert_path.display(),
                        key_path.display()
                    )
                })?;

            info!("Web server listening on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            if config.cert_path.is_some() || config.key_path.is_some() {
                warn!("TLS certificate or key not found, serving plain HTTP");
            }

            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!("Web server listening on http://{}", listener.local_addr()?);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

/// Health check endpoint
async fn health() -> &'static str {
    "osu! Verification Server Running"
}

async fn robots() -> &'static str {
    "User-agent: *\r\nDisallow: /"
}

/// GET /start/{id} - send the user to osu! to log in
async fn start(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect, Html<String>> {
    let id = match Uuid::parse_str(&id) {
        Ok(id) if !id.is_nil() && state.verification_manager.is_known(id) => id,
        _ => {
            warn!("Start requested for unknown verification id {}", id);
            return Err(Html(error_page(VerifyPageError::MissingId)));
        }
    };

    info!("Redirecting verification {} to osu! login", id);
    Ok(Redirect::to(&state.oauth.authorize_url(id)))
}

/// GET /callback - OAuth callback handler
async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<String>, Html<String>> {
    let id = params
        .state
        .as_deref()
        .and_then(|s| Uuid::parse_str(s).ok())
        .filter(|id| !id.is_nil())
        .ok_or_else(|| {
            warn!("Failed to log in user because of the missing id!");
            Html(error_page(VerifyPageError::MissingId))
        })?;

    info!("OAuth callback received for verification {}", id);

    let code = params.code.ok_or_else(|| {
        warn!("Failed to log in user {}: no authorization code", id);
        Html(error_page(VerifyPageError::FailedLogin))
    })?;

    let access_token = exchange_code(&state.oauth, &code).await.map_err(|e| {
        warn!("Failed to log in user {}: {}", id, e.key());
        Html(error_page(e))
    })?;

    if let Err(e) = state.verification_manager.finish(id, &access_token).await {
        error!("Verification {} failed: {}", id, e);
        return Err(Html(error_page(VerifyPageError::FailedVerification)));
    }

    Ok(Html(success_page()))
}

/// Trade the authorization code for an access token
async fn exchange_code(oauth: &OsuOAuthState, code: &str) -> Result<String, VerifyPageError> {
    let redirect_uri = oauth.redirect_uri();
    let response = oauth
        .http_client
        .post(OSU_TOKEN_URL)
        .form(&[
            ("client_id", oauth.client_id.as_str()),
            ("client_secret", oauth.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
        ])
        .send()
        .await
        .map_err(|e| {
            error!("Failed to exchange code: {}", e);
            VerifyPageError::FailedLogin
        })?;

    if !response.status().is_success() {
        let error_text = response.text().await.unwrap_or_default();
        error!("Token exchange failed: {}", error_text);
        return Err(VerifyPageError::FailedLogin);
    }

    let token: TokenResponse = response.json().await.map_err(|e| {
        error!("Failed to parse token response: {}", e);
        VerifyPageError::MissingToken
    })?;

    token
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or(VerifyPageError::MissingToken)
}

fn page(title: &str, icon: &str, accent: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            min-height: 100vh;
            margin: 0;
            background: linear-gradient(135deg, #ff66aa 0%, #8866ee 100%);
        }}
        .container {{
            background: white;
            padding: 40px;
            border-radius: 16px;
            box-shadow: 0 10px 40px rgba(0,0,0,0.2);
            text-align: center;
            max-width: 400px;
        }}
        h1 {{
            color: {accent};
        }}
        .icon {{
            font-size: 60px;
            margin-bottom: 20px;
        }}
    </style>
</head>
<body>
    <div class="container">
        <div class="icon">{icon}</div>
        <h1>{title}</h1>
        {body}
    </div>
</body>
</html>"#,
        title = title,
        icon = icon,
        accent = accent,
        body = body
    )
}

fn success_page() -> String {
    page(
        "Verification Successful!",
        "✓",
        "#2ecc71",
        r#"<p>Your osu! account has been linked and your roles are on their way.</p>
        <p style="color: #888; font-size: 14px;">You can now close this window and check Discord.</p>"#,
    )
}

fn error_page(error: VerifyPageError) -> String {
    page(
        "Verification Failed",
        "✕",
        "#f5576c",
        &format!(
            r#"<p data-error="{key}">{message}</p>
        <p style="color: #888; font-size: 14px;">Error code: {key}</p>"#,
            key = error.key(),
            message = error.message()
        ),
    )
}
