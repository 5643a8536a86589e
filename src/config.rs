//! Configuration types.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Bot configuration, read from the environment at startup.
#[derive(Debug)]
pub struct BotConfig {
    /// Telegram Bot API token.
    pub bot_token: SecretString,
    /// Chat that receives lead notifications.
    pub admin_chat_id: i64,
    /// Log file name (console output is always on).
    pub log_file: String,
}

impl BotConfig {
    /// Read configuration from the environment.
    ///
    /// `BOT_TOKEN` and `ADMIN_CHAT_ID` are required; missing either is a
    /// startup failure, not something the bot runs degraded without.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(
            std::env::var("BOT_TOKEN").ok(),
            std::env::var("ADMIN_CHAT_ID").ok(),
            std::env::var("LEADBOT_LOG").ok(),
        )
    }

    fn from_vars(
        bot_token: Option<String>,
        admin_chat_id: Option<String>,
        log_file: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bot_token = require("BOT_TOKEN", bot_token)?;
        let admin_raw = require("ADMIN_CHAT_ID", admin_chat_id)?;
        let admin_chat_id =
            admin_raw
                .trim()
                .parse::<i64>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "ADMIN_CHAT_ID".to_string(),
                    message: format!("expected a numeric chat id, got {admin_raw:?}"),
                })?;

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            admin_chat_id,
            log_file: log_file.unwrap_or_else(|| "bot.log".to_string()),
        })
    }
}

/// An unset or empty variable counts as missing.
fn require(key: &str, value: Option<String>) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}
