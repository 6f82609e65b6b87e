use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use frombot_core::{config::Config, relay::RelayPipeline};
use frombot_telegram::TelegramMessenger;

mod health;

#[tokio::main]
async fn main() -> Result<(), frombot_core::Error> {
    frombot_core::logging::init("frombot")?;

    let cfg = Arc::new(Config::load()?);
    let messenger = Arc::new(TelegramMessenger::from_token(&cfg.telegram_bot_token));
    let pipeline = Arc::new(RelayPipeline::from_config(&cfg, messenger.clone())?);

    let shutdown = CancellationToken::new();
    let health = if cfg.health_enabled {
        let listener = health::bind(cfg.health_addr).await?;
        Some(tokio::spawn(health::serve(listener, shutdown.clone())))
    } else {
        None
    };

    let polled = frombot_telegram::router::run_polling(messenger.bot(), cfg, pipeline).await;

    shutdown.cancel();
    if let Some(handle) = health {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "health endpoint stopped with error"),
            Err(e) => tracing::warn!(error = %e, "health endpoint task panicked"),
        }
    }

    polled.map_err(|e| frombot_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
