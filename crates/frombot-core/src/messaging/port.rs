use async_trait::async_trait;

use crate::{
    domain::{ChannelId, ChatId, MessageRef},
    Result,
};

/// Outbound side of the relay.
///
/// Telegram is the only implementation; tests use in-memory fakes. Both calls
/// return the sent message reference so adapters can report ids, but the
/// pipeline only cares about success vs failure.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Post plain text to the broadcast channel.
    async fn send_to_channel(&self, channel: &ChannelId, text: &str) -> Result<MessageRef>;

    /// Reply with plain text directly in a chat.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;
}
