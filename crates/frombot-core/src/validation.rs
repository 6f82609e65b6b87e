//! Admission filter for relayed text.
//!
//! A message may be relayed when it is non-empty, carries no mention sigil and
//! every URL-shaped substring in it is an allow-listed permalink.

use std::sync::OnceLock;

use regex::Regex;

use crate::{errors::Error, Result};

/// Bumped whenever either pattern below changes behavior.
pub const PATTERN_VERSION: u32 = 1;

/// Generic URL matcher: `scheme://host.tld/...`, `www.`-prefixed hosts and bare
/// `domain.tld` forms.
pub const URL_PATTERN: &str = r"(?:(?:https?|ftp|ws|wss)://(?:www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b[-a-zA-Z0-9()@:%_+.~#?&/=]*|(?:www\.)?[a-zA-Z0-9-]+\.[a-zA-Z]{2,6}(?:/[a-zA-Z0-9()@:%_+.~#?&/=]*)?)";

/// Permalink back to the source channel, parameterized by message index.
pub const DEFAULT_ALLOWED_LINK_PATTERN: &str = r"https://t\.me/debugging_in_prod/(\d+)";

pub const MENTION_SIGIL: char = '@';

fn url_regex() -> &'static Regex {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    URL_RE.get_or_init(|| Regex::new(URL_PATTERN).expect("valid regex"))
}

/// Anchor the allow-list at the start of each extracted link.
fn allow_list_regex(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})"))
}

/// Where the mention sigil triggers a rejection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MentionRule {
    /// Reject when `@` appears anywhere in the text.
    #[default]
    Anywhere,
    /// Reject only when the (trimmed) text starts with `@`.
    Leading,
}

impl MentionRule {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "anywhere" => Some(Self::Anywhere),
            "leading" => Some(Self::Leading),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    Mention,
    Link,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Mention => "mention",
            Self::Link => "link",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Rejected(RejectReason),
}

impl Admission {
    pub fn is_admitted(self) -> bool {
        matches!(self, Self::Admitted)
    }
}

#[derive(Clone, Debug)]
pub struct Validator {
    allowed_link: Regex,
    mention_rule: MentionRule,
}

impl Validator {
    /// Build a validator around an allow-list pattern.
    ///
    /// The pattern is anchored at the start of each extracted link, so an
    /// allow-listed permalink smuggled inside another URL's query string does
    /// not count as allow-listed.
    pub fn new(allowed_link_pattern: &str, mention_rule: MentionRule) -> Result<Self> {
        let allowed_link = allow_list_regex(allowed_link_pattern).map_err(|e| {
            Error::Config(format!(
                "invalid allowed link pattern {allowed_link_pattern:?}: {e}"
            ))
        })?;
        Ok(Self {
            allowed_link,
            mention_rule,
        })
    }

    pub fn mention_rule(&self) -> MentionRule {
        self.mention_rule
    }

    pub fn is_admissible(&self, text: &str) -> bool {
        self.classify(text).is_admitted()
    }

    pub fn classify(&self, text: &str) -> Admission {
        let text = text.trim();
        if text.is_empty() {
            return Admission::Rejected(RejectReason::Empty);
        }

        let has_mention = match self.mention_rule {
            MentionRule::Anywhere => text.contains(MENTION_SIGIL),
            MentionRule::Leading => text.starts_with(MENTION_SIGIL),
        };
        if has_mention {
            return Admission::Rejected(RejectReason::Mention);
        }

        if extract_links(text)
            .into_iter()
            .any(|link| !self.allowed_link.is_match(link))
        {
            return Admission::Rejected(RejectReason::Link);
        }

        Admission::Admitted
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            allowed_link: allow_list_regex(DEFAULT_ALLOWED_LINK_PATTERN).expect("valid regex"),
            mention_rule: MentionRule::default(),
        }
    }
}

/// All URL-shaped substrings, leftmost-first and non-overlapping.
pub fn extract_links(text: &str) -> Vec<&str> {
    url_regex().find_iter(text).map(|m| m.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_whitespace_rejected() {
        let v = Validator::default();
        assert_eq!(v.classify(""), Admission::Rejected(RejectReason::Empty));
        assert_eq!(
            v.classify("  \n\t "),
            Admission::Rejected(RejectReason::Empty)
        );
        assert!(!v.is_admissible(""));
    }

    #[test]
    fn plain_text_admitted() {
        let v = Validator::default();
        assert!(v.is_admissible("hello world"));
        assert!(v.is_admissible("  multi\nline message, with punctuation!  "));
        assert!(v.is_admissible("e.g. this is fine"));
    }

    #[test]
    fn mention_anywhere_rejected() {
        let v = Validator::default();
        for s in ["@someone hi", "hi @someone", "mail me a@b", "@"] {
            assert_eq!(
                v.classify(s),
                Admission::Rejected(RejectReason::Mention),
                "{s}"
            );
        }
    }

    #[test]
    fn leading_mention_rule_only_checks_first_char() {
        let v = Validator::new(DEFAULT_ALLOWED_LINK_PATTERN, MentionRule::Leading).unwrap();
        assert!(!v.is_admissible("@someone hi"));
        assert!(!v.is_admissible("   @someone hi"));
        assert!(v.is_admissible("hi @someone"));
    }

    #[test]
    fn foreign_links_rejected() {
        let v = Validator::default();
        for s in [
            "check this http://evil.example/x",
            "https://example.com",
            "visit www.example.org today",
            "bare domain.com works too",
            "ftp://files.example.net/a.zip",
            "t.me/debugging_in_prod/42",
        ] {
            assert_eq!(v.classify(s), Admission::Rejected(RejectReason::Link), "{s}");
        }
    }

    #[test]
    fn allow_listed_permalink_admitted() {
        let v = Validator::default();
        assert!(v.is_admissible("see https://t.me/debugging_in_prod/42"));
        assert!(v.is_admissible(
            "https://t.me/debugging_in_prod/1 and https://t.me/debugging_in_prod/2"
        ));
        assert!(v.is_admissible("reply to https://t.me/debugging_in_prod/42."));
    }

    #[test]
    fn mixed_links_rejected() {
        let v = Validator::default();
        assert!(!v.is_admissible(
            "https://t.me/debugging_in_prod/42 and https://evil.example/x"
        ));
        assert!(!v.is_admissible(
            "https://evil.example/?u=https://t.me/debugging_in_prod/42"
        ));
    }

    #[test]
    fn extract_links_is_leftmost_non_overlapping() {
        let links = extract_links("a https://t.me/debugging_in_prod/42 b www.example.com/x c");
        assert_eq!(
            links,
            vec!["https://t.me/debugging_in_prod/42", "www.example.com/x"]
        );
        assert!(extract_links("no links here").is_empty());
    }

    #[test]
    fn custom_allow_list_pattern() {
        let v = Validator::new(r"https://t\.me/my_channel/\d+", MentionRule::Anywhere).unwrap();
        assert!(v.is_admissible("https://t.me/my_channel/7"));
        assert!(!v.is_admissible("https://t.me/debugging_in_prod/7"));
    }

    #[test]
    fn default_matches_explicit_construction() {
        let explicit = Validator::new(DEFAULT_ALLOWED_LINK_PATTERN, MentionRule::default()).unwrap();
        let default = Validator::default();
        for s in [
            "see https://t.me/debugging_in_prod/42",
            "https://evil.example/?u=https://t.me/debugging_in_prod/42",
            "hi @x",
        ] {
            assert_eq!(explicit.classify(s), default.classify(s), "{s}");
        }
    }

    #[test]
    fn invalid_allow_list_pattern_is_config_error() {
        let err = Validator::new("(unclosed", MentionRule::Anywhere).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
