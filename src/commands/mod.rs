// Bot commands
pub mod config;
pub mod serverinfo;

use crate::dispatch::CommandRegistry;
use crate::{Data, Error};

/// Handlers reachable through the dispatch pipeline
pub fn registry() -> CommandRegistry {
    CommandRegistry::new()
        .register(config::definition())
        .register(serverinfo::definition())
}

/// Slash commands registered with Discord
pub fn slash_commands() -> Vec<poise::Command<Data, Error>> {
    vec![config::config(), serverinfo::serverinfo()]
}
