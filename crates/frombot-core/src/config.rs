use std::{
    env, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use crate::{
    domain::ChannelId,
    errors::Error,
    registry::DEFAULT_MAX_ATTEMPTS,
    validation::{MentionRule, DEFAULT_ALLOWED_LINK_PATTERN},
    Result,
};

pub const DEFAULT_CHANNEL: &str = "@debugging_in_prod";
pub const DEFAULT_WORD_POOL_PATH: &str = "dicts.json";
pub const DEFAULT_HEALTH_ADDR: &str = "0.0.0.0:8000";

/// How forwarded posts are tagged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TaggingMode {
    /// `#<pseudonym> #frombot`
    #[default]
    Pseudonym,
    /// `#frombot` only.
    Fixed,
}

impl TaggingMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "pseudonym" => Some(Self::Pseudonym),
            "fixed" => Some(Self::Fixed),
            _ => None,
        }
    }
}

/// What to do with an admitted message when no pseudonym is free.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExhaustionPolicy {
    /// Forward with the shared `#frombot` tag only.
    #[default]
    SharedTag,
    /// Tell the sender and drop the message.
    Reject,
}

impl ExhaustionPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "shared-tag" | "shared_tag" => Some(Self::SharedTag),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// Typed configuration for the relay.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub channel: ChannelId,

    // Admission
    pub mention_rule: MentionRule,
    pub allowed_link_pattern: String,

    // Tagging
    pub tagging: TaggingMode,
    pub word_pool_path: PathBuf,
    pub pseudonym_max_attempts: usize,
    pub exhaustion_policy: ExhaustionPolicy,

    // Health
    pub health_enabled: bool,
    pub health_addr: SocketAddr,

    // Audit
    pub audit_log_path: Option<PathBuf>,
    pub audit_log_json: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let channel_raw = env_str("RELAY_CHANNEL").unwrap_or(DEFAULT_CHANNEL.to_string());
        let channel = ChannelId::parse(&channel_raw)
            .ok_or_else(|| Error::Config(format!("invalid RELAY_CHANNEL: {channel_raw:?}")))?;

        let mention_rule = env_enum("RELAY_MENTION_RULE", MentionRule::parse)?.unwrap_or_default();
        let allowed_link_pattern = env_str("RELAY_ALLOWED_LINK_PATTERN")
            .and_then(non_empty)
            .unwrap_or(DEFAULT_ALLOWED_LINK_PATTERN.to_string());

        let tagging = env_enum("RELAY_TAGGING", TaggingMode::parse)?.unwrap_or_default();
        let word_pool_path = env_path("WORD_POOL_PATH")
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORD_POOL_PATH));
        let pseudonym_max_attempts = env_usize("PSEUDONYM_MAX_ATTEMPTS")
            .unwrap_or(DEFAULT_MAX_ATTEMPTS)
            .max(1);
        let exhaustion_policy =
            env_enum("RELAY_ON_POOL_EXHAUSTED", ExhaustionPolicy::parse)?.unwrap_or_default();

        let health_enabled = env_bool("HEALTH_ENABLED").unwrap_or(true);
        let health_addr_raw = env_str("HEALTH_ADDR").unwrap_or(DEFAULT_HEALTH_ADDR.to_string());
        let health_addr = health_addr_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("invalid HEALTH_ADDR {health_addr_raw:?}: {e}")))?;

        let audit_log_path = env_str("AUDIT_LOG_PATH").and_then(non_empty).map(PathBuf::from);
        let audit_log_json = env_bool("AUDIT_LOG_JSON").unwrap_or(false);

        Ok(Self {
            telegram_bot_token,
            channel,
            mention_rule,
            allowed_link_pattern,
            tagging,
            word_pool_path,
            pseudonym_max_attempts,
            exhaustion_policy,
            health_enabled,
            health_addr,
            audit_log_path,
            audit_log_json,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_enum<T>(key: &str, parse: fn(&str) -> Option<T>) -> Result<Option<T>> {
    let Some(raw) = env_str(key).and_then(non_empty) else {
        return Ok(None);
    };
    parse(&raw)
        .map(Some)
        .ok_or_else(|| Error::Config(format!("invalid {key}: {raw:?}")))
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| parse_bool(&s))
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotenv_parsing_strips_quotes_and_comments() {
        let parsed = parse_dotenv(
            "# comment\n\nTELEGRAM_BOT_TOKEN=\"abc:123\"\nRELAY_CHANNEL = '@chan'\nnot a pair\n=novalue\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("TELEGRAM_BOT_TOKEN".to_string(), "abc:123".to_string()),
                ("RELAY_CHANNEL".to_string(), "@chan".to_string()),
            ]
        );
    }

    #[test]
    fn enum_values_parse() {
        assert_eq!(TaggingMode::parse("Pseudonym"), Some(TaggingMode::Pseudonym));
        assert_eq!(TaggingMode::parse(" fixed "), Some(TaggingMode::Fixed));
        assert_eq!(TaggingMode::parse("both"), None);

        assert_eq!(
            ExhaustionPolicy::parse("shared-tag"),
            Some(ExhaustionPolicy::SharedTag)
        );
        assert_eq!(ExhaustionPolicy::parse("REJECT"), Some(ExhaustionPolicy::Reject));
        assert_eq!(ExhaustionPolicy::parse("spin"), None);

        assert_eq!(MentionRule::parse("leading"), Some(MentionRule::Leading));
        assert_eq!(MentionRule::parse("anywhere"), Some(MentionRule::Anywhere));
    }

    #[test]
    fn bool_parsing() {
        for s in ["1", "true", "YES", " on "] {
            assert!(parse_bool(s), "{s}");
        }
        for s in ["0", "false", "off", ""] {
            assert!(!parse_bool(s), "{s}");
        }
    }

    #[test]
    fn invalid_enum_env_is_config_error() {
        let key = "FROMBOT_TEST_TAGGING_INVALID";
        env::set_var(key, "sometimes");
        let err = env_enum(key, TaggingMode::parse).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        env::remove_var(key);
        assert_eq!(env_enum(key, TaggingMode::parse).unwrap(), None);
    }
}
