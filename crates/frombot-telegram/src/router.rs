use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use frombot_core::{config::Config, relay::RelayPipeline};

use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RelayPipeline>,
}

/// Long-poll Telegram and relay every message until Ctrl-C.
pub async fn run_polling(
    bot: Bot,
    cfg: Arc<Config>,
    pipeline: Arc<RelayPipeline>,
) -> anyhow::Result<()> {
    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "authorized on account"),
        Err(e) => return Err(anyhow::anyhow!("failed to authorize bot: {e}")),
    }
    tracing::info!(
        channel = %cfg.channel,
        tagging = ?cfg.tagging,
        mention_rule = ?cfg.mention_rule,
        "relaying messages"
    );

    let state = Arc::new(AppState { pipeline });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("polling stopped");
    Ok(())
}
