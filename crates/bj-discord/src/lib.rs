//! bj-discord: Discord front end for the blackjack table
//!
//! `/blackjack` スラッシュコマンドと Hit/Stand ボタンを
//! ギルドごとのテーブル (bj-core の SessionRegistry) に接続します。
//! Serenity 0.12 + poise を使用して Discord Gateway に接続します。

pub mod bot;
pub mod commands;
pub mod error;
pub mod handler;
pub mod retry;
pub mod table;

pub use bot::BlackjackBot;
pub use error::{DiscordError, Result};
pub use retry::RetryPolicy;
