//! Discord Bot implementation using Serenity + poise

use std::future::Future;
use std::sync::Arc;

use serenity::all::{ClientBuilder, GatewayIntents, GuildId};
use tracing::{error, info};

use bj_core::{Config, SessionRegistry};

use crate::commands::{self, Data};
use crate::error::{DiscordError, Result};
use crate::handler;
use crate::retry::RetryPolicy;

/// Discord Bot hosting one blackjack table per guild
pub struct BlackjackBot {
    config: Config,
    registry: Arc<SessionRegistry>,
}

impl BlackjackBot {
    /// Create a new bot with an empty registry
    pub fn new(config: Config) -> Self {
        Self::with_registry(config, Arc::new(SessionRegistry::new()))
    }

    /// Create with a shared registry
    pub fn with_registry(config: Config, registry: Arc<SessionRegistry>) -> Self {
        Self { config, registry }
    }

    /// Get the session registry
    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    /// Gateway intents the bot subscribes to
    pub fn intents(&self) -> GatewayIntents {
        // - GUILDS: channel and thread info for the cache
        // - GUILD_MESSAGES + MESSAGE_CONTENT: plain-text trigger only (privileged intent)
        let mut intents = GatewayIntents::GUILDS;
        if self.config.discord.text_trigger {
            intents |= GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;
        }
        intents
    }

    /// Connect and serve events until `shutdown` resolves
    pub async fn start<S>(&self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let token = self
            .config
            .token()
            .ok_or(DiscordError::TokenNotSet)?
            .to_string();

        let guild_id = match self.config.discord.guild_id {
            Some(0) => {
                return Err(DiscordError::Config("discord.guild_id must not be 0".to_string()));
            }
            other => other.map(GuildId::new),
        };

        let data = Data {
            registry: self.registry.clone(),
            table: self.config.table.clone(),
            retry: RetryPolicy::from(&self.config.retry),
            text_trigger: self.config.discord.text_trigger,
        };

        let framework = poise::Framework::builder()
            .options(poise::FrameworkOptions {
                commands: commands::get_commands(),
                event_handler: |ctx, event, framework, data| {
                    Box::pin(handler::event_handler(ctx, event, framework, data))
                },
                on_error: |error| Box::pin(on_error(error)),
                ..Default::default()
            })
            .setup(move |ctx, _ready, framework| {
                Box::pin(async move {
                    let commands = &framework.options().commands;
                    match guild_id {
                        Some(guild_id) => {
                            poise::builtins::register_in_guild(ctx, commands, guild_id).await?;
                            info!("Registered {} command(s) in guild {}", commands.len(), guild_id);
                        }
                        None => {
                            poise::builtins::register_globally(ctx, commands).await?;
                            info!("Registered {} command(s) globally", commands.len());
                        }
                    }
                    Ok(data)
                })
            })
            .build();

        info!("Starting Discord bot...");

        let mut client = ClientBuilder::new(token, self.intents())
            .framework(framework)
            .await?;

        let shard_manager = client.shard_manager.clone();
        tokio::spawn(async move {
            shutdown.await;
            info!("Shutting down Discord shards...");
            shard_manager.shutdown_all().await;
        });

        client.start().await?;

        info!("Discord bot stopped");
        Ok(())
    }
}

/// Log handler failures; nothing beyond the initial acknowledgement reaches users
async fn on_error(error: poise::FrameworkError<'_, Data, DiscordError>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to set up bot: {}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Command /{} failed: {}", ctx.command().name, error);
        }
        poise::FrameworkError::EventHandler { error, event, .. } => {
            error!("Event handler failed on {}: {}", event.snake_case_name(), error);
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling framework error: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intents_without_text_trigger() {
        let bot = BlackjackBot::new(Config::default());
        let intents = bot.intents();
        assert!(intents.contains(GatewayIntents::GUILDS));
        assert!(!intents.contains(GatewayIntents::MESSAGE_CONTENT));
    }

    #[test]
    fn test_intents_with_text_trigger() {
        let mut config = Config::default();
        config.discord.text_trigger = true;
        let intents = BlackjackBot::new(config).intents();
        assert!(intents.contains(GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT));
    }

    #[tokio::test]
    async fn test_start_without_token() {
        let bot = BlackjackBot::new(Config::default());
        let result = bot.start(async {}).await;
        assert!(matches!(result, Err(DiscordError::TokenNotSet)));
    }

    #[tokio::test]
    async fn test_start_with_blank_token() {
        let mut config = Config::default();
        config.discord.token = Some(String::new());
        let bot = BlackjackBot::new(config);
        let result = bot.start(async {}).await;
        assert!(matches!(result, Err(DiscordError::TokenNotSet)));
    }

    #[test]
    fn test_registry_is_shared() {
        let registry = Arc::new(SessionRegistry::new());
        let bot = BlackjackBot::with_registry(Config::default(), registry.clone());
        registry.add_new_game("g1", "t1", "h1", "p1").unwrap();
        assert!(bot.registry().guild_has_game("g1"));
    }
}
