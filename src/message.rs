//! Flash-style messages attached to fragment responses.
//!
//! Handler logic queues notifications during a request; the lifecycle
//! renders them into the fragment HTML, or forwards them to the host's
//! persistent flash store when the response forces a full page reload
//! (refresh or redirect) and inline HTML would be lost.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::HxConfig;
use crate::error::{HxError, Result};

/// Severity of a display notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Developer-facing noise.
    Debug,
    /// Neutral information.
    Info,
    /// A completed action.
    Success,
    /// Something worth attention.
    Warning,
    /// A failed action.
    Error,
}

impl Severity {
    /// Conventional numeric level for this severity.
    pub fn level(self) -> u8 {
        match self {
            Self::Debug => 10,
            Self::Info => 20,
            Self::Success => 25,
            Self::Warning => 30,
            Self::Error => 40,
        }
    }

    /// Lowercase name, used as the fallback display tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// An ephemeral display notification: body text plus severity tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Display text (may contain markup the host chose to emit).
    pub body: String,
    /// Display tag resolved from the configured mapping (CSS classes,
    /// typically).
    pub tag: String,
    /// Severity the message was queued with.
    pub severity: Severity,
}

/// Host-framework persistent flash store.
///
/// Used when a response forces a full page reload and queued messages
/// must survive into the next request.
pub trait FlashStore: Send + Sync {
    /// Persist one message for the next full page render.
    fn push(&self, message: Message);
}

/// Per-request message queue with tags resolved from configuration.
#[derive(Debug, Default)]
pub struct Messages {
    tags: BTreeMap<Severity, String>,
    queue: Vec<Message>,
}

impl Messages {
    /// Build a queue using the configured tag mapping.
    ///
    /// Enabling messages without configuring `message_tags` is a
    /// configuration error, surfaced on first use rather than silently
    /// rendering untagged messages.
    pub fn from_config(config: &HxConfig) -> Result<Self> {
        if config.message_tags.is_empty() {
            return Err(HxError::Config(
                "message_tags must be configured to use messages".into(),
            ));
        }
        Ok(Self {
            tags: config.message_tags.clone(),
            queue: Vec::new(),
        })
    }

    /// Queue that accepts messages but carries no configured tags.
    /// Used when messages are disabled so handler logic keeps working.
    pub fn inert() -> Self {
        Self::default()
    }

    fn push(&mut self, severity: Severity, body: impl Into<String>) {
        let tag = self
            .tags
            .get(&severity)
            .cloned()
            .unwrap_or_else(|| severity.as_str().to_string());
        self.queue.push(Message {
            body: body.into(),
            tag,
            severity,
        });
    }

    /// Queue a debug message.
    pub fn debug(&mut self, body: impl Into<String>) {
        self.push(Severity::Debug, body);
    }

    /// Queue an info message.
    pub fn info(&mut self, body: impl Into<String>) {
        self.push(Severity::Info, body);
    }

    /// Queue a success message.
    pub fn success(&mut self, body: impl Into<String>) {
        self.push(Severity::Success, body);
    }

    /// Queue a warning message.
    pub fn warning(&mut self, body: impl Into<String>) {
        self.push(Severity::Warning, body);
    }

    /// Queue an error message.
    pub fn error(&mut self, body: impl Into<String>) {
        self.push(Severity::Error, body);
    }

    /// Any messages queued this request?
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queued messages, in queue order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.queue.iter()
    }

    /// Take every queued message, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.queue)
    }

    /// Messages as a template context value.
    pub fn as_context(&self) -> serde_json::Value {
        serde_json::to_value(&self.queue).unwrap_or(serde_json::Value::Null)
    }
}
