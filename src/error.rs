//! Error types for leadbot.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Configuration-related errors. All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Transport-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Transport failed to start: {reason}")]
    StartupFailed { reason: String },

    #[error("Failed to send message: {reason}")]
    SendFailed { reason: String },

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Lead notification errors. Logged, never surfaced to the end user.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Failed to deliver lead notification: {0}")]
    Notify(#[from] ChannelError),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
