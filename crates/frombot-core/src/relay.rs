//! Relay pipeline: command dispatch, admission, tagging, forwarding.

use std::sync::Arc;

use crate::{
    audit::{AuditLogger, AuditRecord},
    commands::{reply_for, EXHAUSTED_TEXT, WARNING_TEXT},
    config::{Config, ExhaustionPolicy, TaggingMode},
    domain::{ChannelId, ChatId},
    messaging::{port::MessagingPort, types::InboundMessage},
    registry::{PseudonymRegistry, WordPool},
    validation::{Admission, Validator},
    Result,
};

pub const FROMBOT_TAG: &str = "#frombot";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    Forwarded,
    RejectedWithNotice,
    CommandHandled,
}

#[derive(Clone)]
pub enum Tagging {
    Pseudonym(Arc<PseudonymRegistry>),
    Fixed,
}

/// `text\n\n#<pseudonym> #frombot`, or `text\n\n#frombot` without a pseudonym.
pub fn compose_post(text: &str, pseudonym: Option<&str>) -> String {
    match pseudonym {
        Some(word) => format!("{text}\n\n#{word} {FROMBOT_TAG}"),
        None => format!("{text}\n\n{FROMBOT_TAG}"),
    }
}

pub struct RelayPipeline {
    channel: ChannelId,
    validator: Validator,
    tagging: Tagging,
    exhaustion_policy: ExhaustionPolicy,
    messenger: Arc<dyn MessagingPort>,
    audit: Option<AuditLogger>,
}

impl RelayPipeline {
    pub fn new(
        channel: ChannelId,
        validator: Validator,
        tagging: Tagging,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        Self {
            channel,
            validator,
            tagging,
            exhaustion_policy: ExhaustionPolicy::default(),
            messenger,
            audit: None,
        }
    }

    /// Build the pipeline described by `cfg`, loading the word pool when
    /// pseudonym tagging is enabled.
    pub fn from_config(cfg: &Config, messenger: Arc<dyn MessagingPort>) -> Result<Self> {
        let validator = Validator::new(&cfg.allowed_link_pattern, cfg.mention_rule)?;
        let tagging = match cfg.tagging {
            TaggingMode::Fixed => Tagging::Fixed,
            TaggingMode::Pseudonym => {
                let pool = WordPool::load(&cfg.word_pool_path)?;
                tracing::info!(
                    words = pool.len(),
                    path = %cfg.word_pool_path.display(),
                    "loaded word pool"
                );
                Tagging::Pseudonym(Arc::new(PseudonymRegistry::new(
                    pool,
                    cfg.pseudonym_max_attempts,
                )))
            }
        };

        let mut pipeline = Self::new(cfg.channel.clone(), validator, tagging, messenger)
            .with_exhaustion_policy(cfg.exhaustion_policy);
        if let Some(path) = &cfg.audit_log_path {
            pipeline = pipeline.with_audit(AuditLogger::new(path.clone(), cfg.audit_log_json));
        }
        Ok(pipeline)
    }

    pub fn with_exhaustion_policy(mut self, policy: ExhaustionPolicy) -> Self {
        self.exhaustion_policy = policy;
        self
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn registry(&self) -> Option<&Arc<PseudonymRegistry>> {
        match &self.tagging {
            Tagging::Pseudonym(reg) => Some(reg),
            Tagging::Fixed => None,
        }
    }

    pub async fn handle_message(&self, msg: &InboundMessage) -> RelayOutcome {
        if let Some(command) = &msg.command {
            self.handle_command(msg, command).await;
            return RelayOutcome::CommandHandled;
        }

        let text = msg.text.trim();
        if let Admission::Rejected(reason) = self.validator.classify(text) {
            tracing::info!(
                user_id = msg.user_id.0,
                chat_id = msg.chat_id.0,
                reason = reason.as_str(),
                "message rejected"
            );
            self.audit(AuditRecord::rejected(
                msg.user_id,
                msg.chat_id,
                reason.as_str(),
                text,
            ))
            .await;
            self.notify(msg.chat_id, WARNING_TEXT).await;
            return RelayOutcome::RejectedWithNotice;
        }

        let pseudonym = match &self.tagging {
            Tagging::Fixed => None,
            Tagging::Pseudonym(registry) => match registry.resolve(msg.user_id) {
                Ok(word) => Some(word),
                Err(e) => {
                    tracing::warn!(user_id = msg.user_id.0, error = %e, "no pseudonym available");
                    if self.exhaustion_policy == ExhaustionPolicy::Reject {
                        self.audit(AuditRecord::rejected(
                            msg.user_id,
                            msg.chat_id,
                            "pool_exhausted",
                            text,
                        ))
                        .await;
                        self.notify(msg.chat_id, EXHAUSTED_TEXT).await;
                        return RelayOutcome::RejectedWithNotice;
                    }
                    None
                }
            },
        };

        let post = compose_post(text, pseudonym.as_deref());
        match self.messenger.send_to_channel(&self.channel, &post).await {
            Ok(sent) => {
                tracing::info!(
                    user_id = msg.user_id.0,
                    message_id = sent.message_id.0,
                    tagged = pseudonym.is_some(),
                    "message forwarded"
                );
                self.audit(AuditRecord::forwarded(
                    msg.user_id,
                    msg.chat_id,
                    pseudonym.is_some(),
                    text,
                ))
                .await;
            }
            Err(e) => {
                tracing::error!(
                    user_id = msg.user_id.0,
                    channel = %self.channel,
                    error = %e,
                    "failed to send message to channel"
                );
                self.audit(AuditRecord::delivery_failed(
                    msg.user_id,
                    msg.chat_id,
                    &e.to_string(),
                ))
                .await;
            }
        }

        RelayOutcome::Forwarded
    }

    async fn handle_command(&self, msg: &InboundMessage, command: &str) {
        tracing::debug!(user_id = msg.user_id.0, command, "command received");
        self.audit(AuditRecord::command(msg.user_id, msg.chat_id, command))
            .await;

        if let Some(reply) = reply_for(command, &self.channel) {
            self.notify(msg.chat_id, &reply).await;
        }
    }

    /// Best-effort direct reply; failures are logged only.
    async fn notify(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.messenger.send_text(chat_id, text).await {
            tracing::warn!(chat_id = chat_id.0, error = %e, "failed to send reply");
        }
    }

    /// File appends run on the blocking pool; failures are logged only.
    async fn audit(&self, record: AuditRecord) {
        let Some(audit) = self.audit.clone() else {
            return;
        };
        match tokio::task::spawn_blocking(move || audit.append(&record)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "failed to write audit record"),
            Err(e) => tracing::warn!(error = %e, "audit writer task failed"),
        }
    }
}
