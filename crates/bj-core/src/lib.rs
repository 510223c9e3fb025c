//! bj-core: Blackjack Bot Core Library
//!
//! ギルドごとのブラックジャックテーブルの状態管理、
//! テーブル操作、設定とエラー型を提供します。

pub mod action;
pub mod config;
pub mod error;
pub mod registry;

pub use action::{TableAction, header_content};
pub use config::{Config, DiscordConfig, RetryConfig, TableConfig};
pub use error::{Error, Result};
pub use registry::{Game, GameStatus, Player, PlayerStatus, Seating, SessionRegistry};
