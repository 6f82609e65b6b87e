//! Telegram adapter (teloxide).
//!
//! This crate implements the `frombot-core` MessagingPort over the Telegram
//! Bot API and feeds polled updates into the relay pipeline.

use async_trait::async_trait;

use teloxide::{prelude::*, types::Recipient};

pub mod handlers;
pub mod router;

use frombot_core::{
    domain::{ChannelId, ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::port::MessagingPort,
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn from_token(token: &str) -> Self {
        Self::new(Bot::new(token))
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn recipient(channel: &ChannelId) -> Recipient {
        match channel {
            ChannelId::Username(name) => Recipient::ChannelUsername(name.clone()),
            ChannelId::Id(id) => Recipient::Id(teloxide::types::ChatId(*id)),
        }
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Delivery(format!("telegram error: {e}"))
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_to_channel(&self, channel: &ChannelId, text: &str) -> Result<MessageRef> {
        // Plain text on purpose: user content must not be parsed as markup.
        let msg = self
            .bot
            .send_message(Self::recipient(channel), text.to_string())
            .await
            .map_err(Self::map_err)?;

        Ok(MessageRef {
            chat_id: ChatId(msg.chat.id.0),
            message_id: MessageId(msg.id.0),
        })
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .await
            .map_err(Self::map_err)?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_targets_map_to_recipients() {
        let by_name = TelegramMessenger::recipient(&ChannelId::Username("@chan".to_string()));
        assert_eq!(by_name, Recipient::ChannelUsername("@chan".to_string()));

        let by_id = TelegramMessenger::recipient(&ChannelId::Id(-100123));
        assert_eq!(by_id, Recipient::Id(teloxide::types::ChatId(-100123)));
    }
}
