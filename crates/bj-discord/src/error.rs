//! エラー型定義 (bj-discord)

use thiserror::Error;

/// bj-discord のエラー型
#[derive(Error, Debug)]
pub enum DiscordError {
    #[error("Discord token not set (DISCORD_BOT_TOKEN or DISCORD_SECRET)")]
    TokenNotSet,

    #[error("Table error: {0}")]
    Core(#[from] bj_core::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serenity error: {0}")]
    SerenityError(#[from] serenity::Error),
}

/// Result 型エイリアス
pub type Result<T> = std::result::Result<T, DiscordError>;
