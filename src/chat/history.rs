//! Chat history persistence.
//!
//! The message list and the health context are stored as two independent
//! JSON blobs. Loading is forgiving: a missing, truncated or otherwise
//! unreadable entry resets that part of the state to empty and logs a
//! warning instead of failing the session.

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::storage::KeyValueStore;

/// Storage key for the serialized message list.
pub const HISTORY_KEY: &str = "chat.history";

/// Storage key for the serialized health context.
pub const CONTEXT_KEY: &str = "chat.context";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// ISO-8601 UTC, e.g. `2026-10-19T08:15:02.123Z`.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::now(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::now(Role::Assistant, content)
    }

    fn now(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: now_iso(),
            context: None,
        }
    }

    /// Attach the health context the message was sent with.
    pub fn with_context(mut self, context: Option<Value>) -> Self {
        self.context = context;
        self
    }

    /// `HH:MM` for display; falls back to the raw timestamp.
    pub fn display_time(&self) -> String {
        chrono::DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|t| t.with_timezone(&chrono::Local).format("%H:%M").to_string())
            .unwrap_or_else(|_| self.timestamp.clone())
    }
}

/// Current UTC time in the stored timestamp format.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Everything the history store persists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub messages: Vec<ChatMessage>,
    pub context: Option<Value>,
}

/// Reads and writes chat state through a [`KeyValueStore`].
pub struct HistoryStore {
    store: Box<dyn KeyValueStore>,
}

impl HistoryStore {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load history and context. Never fails.
    pub fn load(&self) -> Snapshot {
        let messages = match self.store.get(HISTORY_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<Vec<ChatMessage>>(&raw).unwrap_or_else(|e| {
                warn!("discarding unreadable chat history: {e}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("could not read chat history: {e:#}");
                Vec::new()
            }
        };

        let context = match self.store.get(CONTEXT_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Null) => None,
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("discarding unreadable health context: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("could not read health context: {e:#}");
                None
            }
        };

        Snapshot { messages, context }
    }

    /// Persist the full message list and the context.
    pub fn save(&mut self, messages: &[ChatMessage], context: Option<&Value>) -> Result<()> {
        let history = serde_json::to_string(messages)?;
        let context = serde_json::to_string(&context)?;
        self.store.set(HISTORY_KEY, &history)?;
        self.store.set(CONTEXT_KEY, &context)?;
        Ok(())
    }

    /// Remove both entries.
    pub fn clear(&mut self) -> Result<()> {
        self.store.remove(HISTORY_KEY)?;
        self.store.remove(CONTEXT_KEY)?;
        Ok(())
    }

    /// Access the underlying store (other components share it).
    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
