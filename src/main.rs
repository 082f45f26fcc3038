use anyhow::{Context as _, Result};
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Discord bot that verifies osu! players and runs onion applications
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the bot configuration file (overrides CONFIG_PATH)
    #[arg(long)]
    config: Option<String>,

    /// Register commands in the configured guild instead of globally (faster for testing)
    #[arg(long)]
    guild_commands: bool,
}

mod commands;
mod config;
mod error;
mod events;
mod guild;
mod integrations;
mod logging;
mod managers;
mod messages;
mod state;
mod web;

use commands::{help, ping};
use config::BotConfig;
use guild::{SerenityGateway, SharedGuildGateway};
use integrations::{HuisApiProvider, OsuApiProvider};
use managers::{
    create_shared_onion_manager, create_shared_role_manager, create_shared_verification_manager,
    SharedOnionManager, SharedVerificationManager,
};
use state::{create_shared_verification_store, SharedVerificationStore};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

const DEFAULT_CONFIG_PATH: &str = "data/config.json";
const DEFAULT_HUIS_API_URL: &str = "https://api.pp.huismetbenen.nl";
const DEFAULT_WEB_BASE_URL: &str = "http://localhost:3001";
const REAPER_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Shared application state
pub struct Data {
    pub config: Arc<BotConfig>,
    pub verification_manager: SharedVerificationManager,
    pub onion_manager: SharedOnionManager,
    pub gateway: SharedGuildGateway,
    pub web_base_url: String,
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::InteractionCreate { interaction } = event {
        if let Err(e) = events::handle_interaction(ctx, interaction, data).await {
            error!("Failed to handle interaction: {}", e);
        }
    }
    Ok(())
}

/// Drop verification requests nobody finished
fn spawn_pending_reaper(store: SharedVerificationStore, ttl: std::time::Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(REAPER_INTERVAL);
        loop {
            interval.tick().await;
            let purged = store.purge_expired(ttl);
            if purged > 0 {
                info!("Purged {} expired verification requests", purged);
            } else {
                debug!("No expired verification requests ({} pending)", store.len());
            }
        }
    });
}

fn log_bot_id(token: &str) {
    // Discord tokens start with the base64 encoded application id
    use base64::Engine;
    let Some(bot_id_b64) = token.split('.').next() else {
        return;
    };
    let decoded = base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(bot_id_b64)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(bot_id_b64));
    if let Some(id_str) = decoded.ok().and_then(|d| String::from_utf8(d).ok()) {
        info!(
            "Bot ID: {} (configure intents at https://discord.com/developers/applications/{}/bot)",
            id_str, id_str
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    logging::init_tracing();

    let token = std::env::var("DISCORD_TOKEN").context("Missing DISCORD_TOKEN environment variable")?;
    log_bot_id(&token);

    let config_path = args
        .config
        .or_else(|| std::env::var("CONFIG_PATH").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    info!("Loading configuration from {}...", config_path);
    let config = Arc::new(BotConfig::load_from_file(&config_path)?);

    let store = create_shared_verification_store();
    spawn_pending_reaper(store.clone(), config.pending_ttl());

    let http_client = reqwest::Client::new();
    let huis_url = std::env::var("HUIS_API_URL").unwrap_or_else(|_| DEFAULT_HUIS_API_URL.to_string());
    let huis_token = std::env::var("HUIS_TOKEN").unwrap_or_else(|_| {
        warn!("HUIS_TOKEN is not set, onion registry calls will be rejected");
        String::new()
    });
    let registry = Arc::new(HuisApiProvider::new(&huis_url, &huis_token)?);
    let profiles = Arc::new(OsuApiProvider::new(http_client.clone()));

    let web_base_url = std::env::var("WEB_BASE_URL")
        .unwrap_or_else(|_| DEFAULT_WEB_BASE_URL.to_string())
        .trim_end_matches('/')
        .to_string();

    let guild_commands = args.guild_commands;
    if guild_commands {
        info!("--guild-commands: Will register commands in guild {}", config.guild_id);
    } else {
        info!("Registering commands globally by default (takes up to 1 hour to propagate)");
    }

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![ping(), help()],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {})",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                            let _ = ctx.say("Something went wrong, please try again later.").await;
                        }
                        poise::FrameworkError::Setup { error, .. } => {
                            error!("Bot setup failed: {}", error);
                        }
                        poise::FrameworkError::EventHandler { error, .. } => {
                            error!("Event handler failed: {}", error);
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            let config = config.clone();
            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                let gateway: SharedGuildGateway =
                    Arc::new(SerenityGateway::new(ctx.http.clone(), config.guild_id()));
                let role_manager = create_shared_role_manager(gateway.clone(), config.clone());
                let verification_manager = create_shared_verification_manager(
                    store,
                    profiles,
                    gateway.clone(),
                    role_manager,
                    config.clone(),
                );
                let onion_manager = create_shared_onion_manager(
                    registry,
                    gateway.clone(),
                    verification_manager.clone(),
                    config.clone(),
                );

                events::ensure_verification_prompt(&ctx.http, &config, ready.user.id).await?;

                if guild_commands {
                    poise::builtins::register_in_guild(
                        ctx,
                        &framework.options().commands,
                        config.guild_id(),
                    )
                    .await?;
                } else {
                    poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                }
                info!("Registered {} commands", framework.options().commands.len());

                match web::OsuOAuthState::from_env(http_client) {
                    Some(oauth) => {
                        let web_config = web::WebServerConfig::from_env();
                        let web_verification_manager = verification_manager.clone();
                        tokio::spawn(async move {
                            info!("Starting OAuth web server on port {}...", web_config.port);
                            if let Err(e) =
                                web::start_web_server(web_config, oauth, web_verification_manager)
                                    .await
                            {
                                error!("Web server error: {}", e);
                            }
                        });
                    }
                    None => {
                        warn!("OSU_CLIENT_ID / OSU_CLIENT_SECRET not set, verification links will not work");
                    }
                }

                Ok(Data {
                    config,
                    verification_manager,
                    onion_manager,
                    gateway,
                    web_base_url,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::GUILD_MEMBERS;

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    client.start().await?;

    Ok(())
}
