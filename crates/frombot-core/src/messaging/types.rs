use crate::domain::{ChatId, UserId};

/// Prefix that marks a command invocation (`/start`).
pub const COMMAND_MARKER: char = '/';

/// Messenger-agnostic inbound message.
///
/// Non-text updates (photos, files, stickers) arrive with empty `text`, so they
/// take the rejection path like any other inadmissible message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub text: String,
    /// Lowercased command name without marker or `@botname` suffix.
    pub command: Option<String>,
}

impl InboundMessage {
    /// Build from raw text, classifying command invocations from the text
    /// itself.
    pub fn new(chat_id: ChatId, user_id: UserId, text: impl Into<String>) -> Self {
        let text = text.into();
        let command = parse_command(&text).map(|(name, _)| name);
        Self::with_command(chat_id, user_id, text, command)
    }

    /// Build with a command classification supplied by the messenger adapter.
    pub fn with_command(
        chat_id: ChatId,
        user_id: UserId,
        text: impl Into<String>,
        command: Option<String>,
    ) -> Self {
        Self {
            chat_id,
            user_id,
            text: text.into(),
            command,
        }
    }

    pub fn is_command(&self) -> bool {
        self.command.is_some()
    }
}

const MAX_COMMAND_LEN: usize = 32;

fn is_command_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Split `/cmd@botname args` into `("cmd", "args")`.
///
/// The name is 1..=32 of `[A-Za-z0-9_]`, optionally followed by `@botname`,
/// and must end at whitespace or end of text. Anything else (`/r/rust`,
/// `/😀`) is ordinary text.
pub fn parse_command(text: &str) -> Option<(String, String)> {
    let body = text.strip_prefix(COMMAND_MARKER)?;
    let (first, rest) = match body.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (body, ""),
    };

    let (name, bot) = match first.split_once('@') {
        Some((name, bot)) => (name, Some(bot)),
        None => (first, None),
    };
    if name.is_empty() || name.len() > MAX_COMMAND_LEN || !name.chars().all(is_command_char) {
        return None;
    }
    if let Some(bot) = bot {
        if bot.is_empty() || !bot.chars().all(is_command_char) {
            return None;
        }
    }
    Some((name.to_ascii_lowercase(), rest.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse_command("/start"),
            Some(("start".to_string(), String::new()))
        );
        assert_eq!(
            parse_command("/Help@frombot_bot  please"),
            Some(("help".to_string(), "please".to_string()))
        );
        assert_eq!(parse_command("/"), None);
        assert_eq!(parse_command("/ start"), None);
        assert_eq!(parse_command("hello /start"), None);
        assert_eq!(parse_command(" /start"), None);
    }

    #[test]
    fn non_command_slashes_are_plain_text() {
        for s in [
            "/r/rust is great today",
            "/😀 hello",
            "/usr/bin is full",
            "/start@",
            "/start@bot!",
            "/-1 points",
        ] {
            assert_eq!(parse_command(s), None, "{s}");
        }
        let long = format!("/{}", "a".repeat(MAX_COMMAND_LEN + 1));
        assert_eq!(parse_command(&long), None);
        assert!(parse_command(&format!("/{}", "a".repeat(MAX_COMMAND_LEN))).is_some());
    }

    #[test]
    fn inbound_message_classifies_commands() {
        let cmd = InboundMessage::new(ChatId(1), UserId(2), "/start");
        assert!(cmd.is_command());
        assert_eq!(cmd.command.as_deref(), Some("start"));

        let text = InboundMessage::new(ChatId(1), UserId(2), "hello world");
        assert!(!text.is_command());

        let supplied = InboundMessage::with_command(ChatId(1), UserId(2), "/start", None);
        assert!(!supplied.is_command());
    }
}
