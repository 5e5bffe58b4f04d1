// Koharu Bot - Rust Edition
// A lightweight Discord moderation bot with per-server configuration

mod commands;
mod db;
mod discord;
mod dispatch;
mod error;
mod features;
mod models;
mod settings;
mod utils;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use poise::serenity_prelude as serenity;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::db::ConfigStore;
use crate::dispatch::{CommandRegistry, RateLimiter};
use crate::features::member_counts::MemberCountCache;
use crate::settings::Settings;
use crate::utils::config::{COOLDOWN_SWEEP_INTERVAL, GENERIC_FAILURE};

/// User data shared across all commands
#[derive(Debug)]
pub struct Data {
    pub store: ConfigStore,
    pub cooldowns: Arc<RateLimiter>,
    pub registry: CommandRegistry,
    pub member_counts: MemberCountCache,
    pub member_fetch_timeout: Duration,
}

impl Data {
    pub fn new(store: ConfigStore, registry: CommandRegistry, member_fetch_timeout: Duration) -> Self {
        Self {
            store,
            cooldowns: Arc::new(RateLimiter::new()),
            registry,
            member_counts: MemberCountCache::new(),
            member_fetch_timeout,
        }
    }
}

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "koharu_rs=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    info!("Starting Koharu Bot (Rust Edition)...");

    let store = ConfigStore::connect(&settings.database_url).await?;
    let guild_id = settings.guild_id;
    let member_fetch_timeout = settings.member_fetch_timeout;

    // Setup framework
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::slash_commands(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(discord::events::handle_event(ctx, event, framework, data))
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!(command = ctx.command().name, "Command error: {:?}", error);
                            let reply = poise::CreateReply::default().content(GENERIC_FAILURE).ephemeral(true);
                            if let Err(e) = ctx.send(reply).await {
                                error!("Failed to report error for '{}': {:?}", ctx.command().name, e);
                            }
                        }
                        other => {
                            if let Err(e) = poise::builtins::on_error(other).await {
                                error!("Error while handling error: {:?}", e);
                            }
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!(bot = %ready.user.name, "Bot is ready! Registering commands...");

                if let Some(guild_id) = guild_id {
                    poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id).await?;
                    info!(guild_id = %guild_id, "Slash commands registered to guild");
                } else {
                    poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                    info!("Slash commands registered globally");
                }

                let data = Data::new(store, commands::registry(), member_fetch_timeout);
                data.cooldowns.spawn_sweeper(COOLDOWN_SWEEP_INTERVAL);
                info!(commands = ?data.registry.names(), "Dispatch ready");

                Ok(data)
            })
        })
        .build();

    // MESSAGE_CONTENT and GUILD_MEMBERS are privileged, enable them in the Discord Dev Portal
    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let mut client = serenity::ClientBuilder::new(&settings.discord_token, intents)
        .framework(framework)
        .await?;

    // Run with graceful shutdown
    let shard_manager = client.shard_manager.clone();

    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutting down...");
        shard_manager.shutdown_all().await;
    });

    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    info!("Goodbye!");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {:?}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {:?}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
