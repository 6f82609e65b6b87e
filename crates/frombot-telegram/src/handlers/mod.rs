//! Telegram update handlers.
//!
//! Each handler converts a teloxide update into the core's inbound model and
//! hands it to the relay pipeline. Delivery errors are handled inside the
//! pipeline, so handlers never fail the dispatcher.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{Message, MessageEntityKind},
};

use frombot_core::{
    domain::{ChatId, UserId},
    messaging::types::{parse_command, InboundMessage},
};

use crate::router::AppState;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(inbound) = to_inbound(&msg) else {
        return Ok(());
    };

    let outcome = state.pipeline.handle_message(&inbound).await;
    tracing::debug!(
        chat_id = inbound.chat_id.0,
        outcome = ?outcome,
        "update handled"
    );
    Ok(())
}

/// Messages without a sender (channel posts, anonymous admins) are skipped.
/// Non-text messages map to empty text and are rejected downstream.
fn to_inbound(msg: &Message) -> Option<InboundMessage> {
    let user = msg.from()?;
    let text = msg.text().unwrap_or_default();
    Some(InboundMessage::with_command(
        ChatId(msg.chat.id.0),
        UserId(user.id.0 as i64),
        text,
        command_of(msg),
    ))
}

/// A message is a command only when Telegram marks a `bot_command` entity at
/// offset 0.
fn command_of(msg: &Message) -> Option<String> {
    let text = msg.text()?;
    let entity = msg
        .entities()?
        .iter()
        .find(|e| e.offset == 0 && e.kind == MessageEntityKind::BotCommand)?;
    // Entity lengths are UTF-16 units; command tokens are ASCII.
    let token = text.get(..entity.length)?;
    parse_command(token).map(|(name, _)| name)
}
