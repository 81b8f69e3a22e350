//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines the
//! pipeline constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Archival chat where every media item is re-stored
    pub bin_channel: i64,

    /// Comma-separated list of operator IDs that receive internal alerts
    #[serde(rename = "owner_id")]
    pub owner_ids_str: Option<String>,

    /// Base URL of the streaming server that serves archived files
    #[serde(default = "default_stream_base_url")]
    pub stream_base_url: String,

    /// Whether generated links should go through the link shortener
    #[serde(default)]
    pub shorten_media_links: bool,

    /// Comma-separated list of banned user IDs
    #[serde(rename = "banned_users")]
    pub banned_users_str: Option<String>,

    /// Comma-separated list of banned channel IDs
    #[serde(rename = "banned_channels")]
    pub banned_channels_str: Option<String>,

    /// Channel users must join before using the bot
    pub force_sub_channel: Option<i64>,

    /// Largest `/link N` batch accepted from a single request
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Time-to-live (seconds) of the seen-message cache
    #[serde(default = "default_message_cache_ttl")]
    pub message_cache_ttl_secs: u64,

    /// Maximum number of media messages kept in the seen-message cache
    #[serde(default = "default_message_cache_max_size")]
    pub message_cache_max_size: u64,
}

fn default_stream_base_url() -> String {
    "http://localhost:8080".to_string()
}

const fn default_max_batch_size() -> usize {
    100
}

const fn default_message_cache_ttl() -> u64 {
    MESSAGE_CACHE_TTL_SECS
}

const fn default_message_cache_max_size() -> u64 {
    MESSAGE_CACHE_MAX_SIZE
}

/// Split an ID list on commas, semicolons and whitespace, skipping bad tokens.
fn parse_id_list(raw: Option<&String>) -> HashSet<i64> {
    raw.map(|s| {
        s.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .filter_map(|id| id.parse::<i64>().ok())
            .collect()
    })
    .unwrap_or_default()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use stream_link_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Local overrides, not checked into git
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Bare UPPER_SNAKE_CASE variables map onto snake_case keys
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        s.try_deserialize()
    }

    /// Returns the operators that receive internal error reports
    #[must_use]
    pub fn owner_ids(&self) -> HashSet<i64> {
        parse_id_list(self.owner_ids_str.as_ref())
    }

    /// Returns the set of banned user IDs
    #[must_use]
    pub fn banned_users(&self) -> HashSet<i64> {
        parse_id_list(self.banned_users_str.as_ref())
    }

    /// Returns the set of banned channel IDs
    #[must_use]
    pub fn banned_channels(&self) -> HashSet<i64> {
        parse_id_list(self.banned_channels_str.as_ref())
    }
}

// Pipeline configuration
/// Source message ids fetched and processed per batch window
pub const BATCH_WINDOW_SIZE: usize = 10;
/// Links bundled into one batch delivery message
pub const DELIVERY_CHUNK_SIZE: usize = 20;
/// Completions between two progress re-renders
pub const PROGRESS_STEP: usize = 5;
/// Pause between two batch delivery messages
pub const CHUNK_DELAY_MS: u64 = 500;
/// Longest URL allowed into an inline button
pub const BUTTON_URL_MAX_LEN: usize = 1024;
/// Hex characters in an error correlation token
pub const ERROR_ID_LEN: usize = 12;
/// Longest error text forwarded to operators
pub const OPERATOR_ALERT_MAX_CHARS: usize = 3000;

/// Default time-to-live (seconds) for seen-message cache entries.
/// Default: 24 hours.
pub const MESSAGE_CACHE_TTL_SECS: u64 = 86_400;
/// Default seen-message cache capacity (number of entries).
pub const MESSAGE_CACHE_MAX_SIZE: u64 = 100_000;

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn base_settings() -> Settings {
        Settings {
            telegram_token: "dummy".to_string(),
            bin_channel: -1001,
            owner_ids_str: None,
            stream_base_url: default_stream_base_url(),
            shorten_media_links: false,
            banned_users_str: None,
            banned_channels_str: None,
            force_sub_channel: None,
            max_batch_size: default_max_batch_size(),
            message_cache_ttl_secs: MESSAGE_CACHE_TTL_SECS,
            message_cache_max_size: MESSAGE_CACHE_MAX_SIZE,
        }
    }

    #[test]
    fn test_config_env_loading() -> Result<(), Box<dyn std::error::Error>> {
        env::set_var("TELEGRAM_TOKEN", "dummy_token");
        env::set_var("BIN_CHANNEL", "-1001234567890");
        env::set_var("MAX_BATCH_SIZE", "50");

        let settings = Settings::new()?;
        assert_eq!(settings.telegram_token, "dummy_token");
        assert_eq!(settings.bin_channel, -1_001_234_567_890);
        assert_eq!(settings.max_batch_size, 50);
        assert!(!settings.shorten_media_links);
        assert_eq!(settings.stream_base_url, "http://localhost:8080");

        env::remove_var("TELEGRAM_TOKEN");
        env::remove_var("BIN_CHANNEL");
        env::remove_var("MAX_BATCH_SIZE");
        Ok(())
    }

    #[test]
    fn test_list_parsing() {
        let mut settings = base_settings();

        settings.owner_ids_str = Some("123,456".to_string());
        let owners = settings.owner_ids();
        assert!(owners.contains(&123));
        assert!(owners.contains(&456));
        assert_eq!(owners.len(), 2);

        settings.banned_users_str = Some("333; 444, 555".to_string());
        let banned = settings.banned_users();
        assert_eq!(banned.len(), 3);
        assert!(banned.contains(&444));

        // Channel ids are negative
        settings.banned_channels_str = Some("-1001 abc -1002".to_string());
        let channels = settings.banned_channels();
        assert!(channels.contains(&-1001));
        assert!(channels.contains(&-1002));
        assert_eq!(channels.len(), 2);
    }

    #[test]
    fn test_missing_lists_are_empty() {
        let settings = base_settings();
        assert!(settings.owner_ids().is_empty());
        assert!(settings.banned_users().is_empty());
        assert!(settings.banned_channels().is_empty());
    }
}
