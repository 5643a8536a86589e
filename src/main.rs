use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use leadbot::catalog::Catalog;
use leadbot::channels::{TelegramTransport, Transport};
use leadbot::config::BotConfig;
use leadbot::conversation::Controller;
use leadbot::runner::Runner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing BOT_TOKEN or ADMIN_CHAT_ID refuses to start.
    let config = BotConfig::from_env()?;

    // Logs go to the console and to the log file.
    let file_appender = tracing_appender::rolling::never(".", &config.log_file);
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    let transport: Arc<dyn Transport> =
        Arc::new(TelegramTransport::new(config.bot_token, config.admin_chat_id));

    // Best-effort readiness ping to the admin chat.
    if let Err(e) = transport
        .notify_admin("<b>🤖 Бот запущен и готов к работе!</b>")
        .await
    {
        tracing::warn!(error = %e, "startup notification to admin chat failed");
    }

    tracing::info!(admin_chat_id = config.admin_chat_id, "bot started, polling for updates");

    let runner = Runner::new(Controller::new(Catalog::default()), transport);
    runner.run().await?;

    Ok(())
}
