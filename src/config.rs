//! Relay configuration - environment variables, CLI overrides, validation
//!
//! Required: bot token, source channel id, destination chat id. Missing any
//! of these is a configuration-time error and fatal before the pipeline
//! starts. The store and webhook are optional; leaving them unset disables
//! the corresponding pipeline stages.

use anyhow::{bail, Result};

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Telegram bot token.
    pub bot_token: String,
    /// Channel the bot listens to.
    pub source_chat_id: i64,
    /// Chat every post is copied into.
    pub target_chat_id: i64,
    /// PostgreSQL connection URL. None disables persistence.
    pub database_url: Option<String>,
    /// Notification webhook URL. None disables notifications.
    pub webhook_url: Option<String>,
    /// Optional shared secret sent as `x-webhook-key`.
    pub webhook_api_key: Option<String>,
}

impl RelayConfig {
    /// Load configuration from environment variables with CLI overrides.
    ///
    /// Env names keep both the current and the legacy spellings:
    /// `TELEGRAM_BOT_TOKEN`/`BOT_TOKEN`, `TELEGRAM_SOURCE_CHAT_ID`/
    /// `SOURCE_CHANNEL_ID`, `TELEGRAM_TARGET_GROUP_ID`/`TARGET_GROUP_ID`.
    pub fn from_env(
        bot_token: Option<String>,
        source_chat_id: Option<i64>,
        target_chat_id: Option<i64>,
        database_url: Option<String>,
        webhook_url: Option<String>,
    ) -> Result<Self> {
        let bot_token = bot_token
            .or_else(|| env_var("TELEGRAM_BOT_TOKEN"))
            .or_else(|| env_var("BOT_TOKEN"));
        let Some(bot_token) = bot_token else {
            bail!("Missing TELEGRAM_BOT_TOKEN (or BOT_TOKEN)");
        };

        let source_chat_id = match source_chat_id {
            Some(id) => id,
            None => parse_chat_id("TELEGRAM_SOURCE_CHAT_ID", "SOURCE_CHANNEL_ID")?,
        };
        let target_chat_id = match target_chat_id {
            Some(id) => id,
            None => parse_chat_id("TELEGRAM_TARGET_GROUP_ID", "TARGET_GROUP_ID")?,
        };

        let database_url = database_url.or_else(|| env_var("DATABASE_URL"));
        let webhook_url = webhook_url.or_else(|| env_var("WEBHOOK_URL"));
        let webhook_api_key = env_var("WEBHOOK_API_KEY");

        Ok(Self {
            bot_token,
            source_chat_id,
            target_chat_id,
            database_url,
            webhook_url,
            webhook_api_key,
        })
    }

    /// Whether a backing store is configured.
    pub fn postgres_enabled(&self) -> bool {
        self.database_url.is_some()
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_chat_id(primary: &str, legacy: &str) -> Result<i64> {
    let Some(raw) = env_var(primary).or_else(|| env_var(legacy)) else {
        bail!("Missing {primary} (or {legacy})");
    };
    match raw.trim().parse() {
        Ok(id) => Ok(id),
        Err(_) => bail!("{primary} is not a numeric chat id: {raw:?}"),
    }
}
