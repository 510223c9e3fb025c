//! Slash commands for Discord bot (poise implementation)

mod blackjack;

use std::sync::Arc;

use bj_core::{SessionRegistry, TableConfig};

use crate::retry::RetryPolicy;

/// User data stored and accessible in all command invocations
pub struct Data {
    pub registry: Arc<SessionRegistry>,
    pub table: TableConfig,
    pub retry: RetryPolicy,
    pub text_trigger: bool,
}

/// Error type for commands
pub type Error = crate::error::DiscordError;

/// Export commands for registration
pub use blackjack::blackjack;

/// Get all commands for registration
pub fn get_commands() -> Vec<poise::Command<Data, Error>> {
    vec![blackjack()]
}
