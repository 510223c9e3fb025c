//! Error types for bj-core

use thiserror::Error;

/// Main error type for bj-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("No game running in guild {0}")]
    GameNotFound(String),

    #[error("Player {player_id} is not seated in guild {guild_id}")]
    PlayerNotFound { guild_id: String, player_id: String },

    #[error("Guild {0} already has a game")]
    GameAlreadyExists(String),

    #[error("Player {player_id} already joined the game in guild {guild_id}")]
    AlreadyJoined { guild_id: String, player_id: String },

    #[error("Unknown table action: {0}")]
    UnknownAction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for bj-core
pub type Result<T> = std::result::Result<T, Error>;
