//! Static replies for bot commands.

use crate::domain::ChannelId;

pub const WARNING_TEXT: &str =
    "Your message contains a link or invalid content and cannot be posted.";

pub const EXHAUSTED_TEXT: &str =
    "The relay is out of pseudonyms right now. Please try again later.";

pub fn welcome_text(channel: &ChannelId) -> String {
    format!(
        "Welcome! This bot lets you post anonymously to the {channel} Telegram channel.\n\
Simply send your message, and it will appear in {channel} with the hashtag #frombot.\n\
Please note that links, mentions and files are not supported."
    )
}

/// Reply text for a command, or `None` for commands the bot ignores.
pub fn reply_for(command: &str, channel: &ChannelId) -> Option<String> {
    match command {
        "start" | "help" => Some(welcome_text(channel)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_and_help_share_the_welcome_text() {
        let ch = ChannelId::Username("@debugging_in_prod".to_string());
        let start = reply_for("start", &ch).unwrap();
        assert!(start.contains("@debugging_in_prod"));
        assert!(start.contains("#frombot"));
        assert_eq!(reply_for("help", &ch), Some(start));
        assert_eq!(reply_for("settings", &ch), None);
    }
}
