//! Append-only record of relay decisions.
//!
//! Records never carry message text or the assigned pseudonym: a line tying a
//! sender id to either would undo the pseudonym. Admitted and rejected
//! messages are logged by length only.

use std::{
    fmt,
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::{
    domain::{ChatId, UserId},
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    Forwarded,
    Rejected,
    Command,
    DeliveryFailed,
}

impl AuditKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Forwarded => "forwarded",
            Self::Rejected => "rejected",
            Self::Command => "command",
            Self::DeliveryFailed => "delivery_failed",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AuditRecord {
    pub timestamp: String,
    pub event: AuditKind,
    pub user_id: i64,
    pub chat_id: i64,

    /// Whether the post carried a pseudonym tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagged: Option<bool>,
    /// Character count of the relayed or rejected text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chars: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditRecord {
    fn base(event: AuditKind, user_id: UserId, chat_id: ChatId) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            event,
            user_id: user_id.0,
            chat_id: chat_id.0,
            tagged: None,
            chars: None,
            reason: None,
            command: None,
            error: None,
        }
    }

    pub fn forwarded(user_id: UserId, chat_id: ChatId, tagged: bool, text: &str) -> Self {
        Self {
            tagged: Some(tagged),
            chars: Some(text.chars().count()),
            ..Self::base(AuditKind::Forwarded, user_id, chat_id)
        }
    }

    pub fn rejected(user_id: UserId, chat_id: ChatId, reason: &str, text: &str) -> Self {
        Self {
            reason: Some(reason.to_string()),
            chars: Some(text.chars().count()),
            ..Self::base(AuditKind::Rejected, user_id, chat_id)
        }
    }

    pub fn command(user_id: UserId, chat_id: ChatId, command: &str) -> Self {
        Self {
            command: Some(command.to_string()),
            ..Self::base(AuditKind::Command, user_id, chat_id)
        }
    }

    pub fn delivery_failed(user_id: UserId, chat_id: ChatId, error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::base(AuditKind::DeliveryFailed, user_id, chat_id)
        }
    }
}

/// `<timestamp> event=<kind> user_id=.. chat_id=.. [key=value ...]`
impl fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} event={} user_id={} chat_id={}",
            self.timestamp,
            self.event.as_str(),
            self.user_id,
            self.chat_id
        )?;
        if let Some(t) = self.tagged {
            write!(f, " tagged={t}")?;
        }
        if let Some(n) = self.chars {
            write!(f, " chars={n}")?;
        }
        if let Some(r) = &self.reason {
            write!(f, " reason={r}")?;
        }
        if let Some(c) = &self.command {
            write!(f, " command={c}")?;
        }
        if let Some(e) = &self.error {
            write!(f, " error={e:?}")?;
        }
        Ok(())
    }
}

/// One line per record, plain `key=value` or JSON.
#[derive(Clone, Debug)]
pub struct AuditLogger {
    path: PathBuf,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn render(&self, record: &AuditRecord) -> Result<String> {
        let mut line = if self.json {
            serde_json::to_string(record)?
        } else {
            record.to_string()
        };
        line.push('\n');
        Ok(line)
    }

    /// Blocking append; callers on an async runtime should go through
    /// `spawn_blocking`.
    pub fn append(&self, record: &AuditRecord) -> Result<()> {
        let line = self.render(record)?;
        // Single write per record so concurrent appends stay line-atomic.
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?
            .write_all(line.as_bytes())?;
        Ok(())
    }
}
