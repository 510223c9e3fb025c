//! Configuration management
//!
//! 設定は以下の優先順位で読み込まれます:
//! 1. 環境変数
//! 2. blackjack-bot.toml 設定ファイル
//! 3. デフォルト値
//!
//! 設定ファイル内では `${VAR_NAME}` 形式で環境変数を展開できます。

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Error;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "blackjack-bot.toml";

/// Auto-archive durations Discord accepts for threads, in minutes
pub const ARCHIVE_DURATIONS: [u16; 4] = [60, 1440, 4320, 10080];

/// Main configuration for the blackjack bot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discord: DiscordConfig,
    pub table: TableConfig,
    pub retry: RetryConfig,
}

/// Discord connection settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token
    #[serde(skip_serializing)]
    pub token: Option<String>,

    /// Register `/blackjack` in this guild only (instant) instead of globally
    pub guild_id: Option<u64>,

    /// Also react to plain `/blackjack` chat messages
    /// (needs the privileged message content intent)
    pub text_trigger: bool,
}

/// Table thread settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Name of every player's thread
    pub thread_name: String,

    /// Thread auto-archive duration in minutes
    pub auto_archive_minutes: u16,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            thread_name: default_thread_name(),
            auto_archive_minutes: 60,
        }
    }
}

/// Retry settings for outbound Discord calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 = no retry)
    pub max_retries: u32,

    /// Backoff before the first retry, doubled on each further retry
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 250,
        }
    }
}

fn default_thread_name() -> String {
    "Blackjack Table".to_string()
}

impl Config {
    /// 設定ファイルから環境変数を展開する
    ///
    /// `${VAR_NAME}` 形式の文字列を環境変数の値に置換します。
    /// 環境変数が存在しない場合は空文字列になります。
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::with_capacity(value.len());
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' || chars.peek() != Some(&'{') {
                result.push(c);
                continue;
            }
            chars.next(); // '{'

            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }

            if let Ok(env_value) = std::env::var(&var_name) {
                result.push_str(&env_value);
            }
        }

        result
    }

    /// TOML 文字列から設定を読み込む (環境変数の上書きなし)
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded = Self::expand_env_vars(content);
        let config: Config = toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 設定ファイルから設定を読み込む
    ///
    /// 既存の環境変数が設定ファイルの値より優先されます。
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// デフォルトパスから設定を読み込む
    ///
    /// 1. `path` が指定されていればそのファイル
    /// 2. `./blackjack-bot.toml`
    /// 3. 見つからない場合は環境変数のみ
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        if let Some(path) = path {
            return Self::from_toml_file(path);
        }

        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }

        Self::from_env()
    }

    /// 環境変数で設定を上書きする
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // DISCORD_SECRET is the historical name; DISCORD_BOT_TOKEN wins when both are set
        if let Some(token) = non_empty("DISCORD_BOT_TOKEN").or_else(|| non_empty("DISCORD_SECRET")) {
            self.discord.token = Some(token.trim().to_string());
        }

        if let Some(id) = non_empty("DISCORD_GUILD_ID").and_then(|v| v.trim().parse().ok()) {
            self.discord.guild_id = Some(id);
        }

        if let Some(flag) = non_empty("BLACKJACK_TEXT_TRIGGER") {
            self.discord.text_trigger = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Some(retries) = non_empty("BLACKJACK_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            self.retry.max_retries = retries;
        }

        if let Some(ms) = non_empty("BLACKJACK_RETRY_BASE_MS").and_then(|v| v.parse().ok()) {
            self.retry.base_delay_ms = ms;
        }
    }

    /// Reject values Discord would refuse at runtime
    pub fn validate(&self) -> crate::Result<()> {
        if !ARCHIVE_DURATIONS.contains(&self.table.auto_archive_minutes) {
            return Err(Error::Config(format!(
                "table.auto_archive_minutes must be one of {:?}, got {}",
                ARCHIVE_DURATIONS, self.table.auto_archive_minutes
            )));
        }

        if self.discord.guild_id == Some(0) {
            return Err(Error::Config("discord.guild_id must not be 0".to_string()));
        }

        let name_len = self.table.thread_name.chars().count();
        if name_len == 0 || name_len > 100 {
            return Err(Error::Config(
                "table.thread_name must be 1-100 characters".to_string(),
            ));
        }

        Ok(())
    }

    /// Bot token, if one was configured. A blank value counts as unset.
    pub fn token(&self) -> Option<&str> {
        self.discord
            .token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }
}
