//! Shared data types for the Atlas assistant client: messages, match records,
//! languages, and the service health payload.

mod health;
mod record;

pub use health::ServiceHealth;
pub use record::{DisplayText, MatchRecord, RecordId};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a message within a session.
pub type MessageId = Uuid;

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Message typed or dictated by the user.
    User,
    /// Message produced by the assistant (greetings, answers, errors).
    Assistant,
}

/// Conversation language. The primary language is English, the secondary Arabic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en", alias = "primary")]
    Primary,
    #[serde(rename = "ar", alias = "secondary")]
    Secondary,
}

impl Language {
    /// Short language code used in config files and record name maps.
    pub fn code(self) -> &'static str {
        match self {
            Language::Primary => "en",
            Language::Secondary => "ar",
        }
    }

    /// Locale passed to speech recognition backends.
    pub fn speech_locale(self) -> &'static str {
        match self {
            Language::Primary => "en-US",
            Language::Secondary => "ar-SA",
        }
    }

    /// The other language of the pair.
    pub fn other(self) -> Language {
        match self {
            Language::Primary => Language::Secondary,
            Language::Secondary => Language::Primary,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" | "primary" => Ok(Language::Primary),
            "ar" | "secondary" => Ok(Language::Secondary),
            other => Err(format!("unknown language: {other}")),
        }
    }
}

/// Optional annotations attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMeta {
    /// Search results attached to an assistant reply.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<MatchRecord>,
    /// Round-trip latency, server-reported when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    /// Advisory string such as a fallback notice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Marks a retrieval-only reply produced by the debug path.
    #[serde(default)]
    pub debug: bool,
    /// Marks a reply describing a failure.
    #[serde(default)]
    pub error: bool,
}

/// A single transcript entry. Messages never change once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Random per-message token.
    pub id: MessageId,
    /// Author role.
    pub role: Role,
    /// Visible text.
    pub content: String,
    /// Creation instant.
    #[serde(rename = "time")]
    pub timestamp: DateTime<Utc>,
    /// Optional annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MessageMeta>,
}

impl Message {
    /// Build a message stamped with a fresh id and the current time.
    pub fn new(role: Role, content: impl Into<String>, meta: Option<MessageMeta>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            meta,
        }
    }

    /// Matches attached to this message, empty when there are none.
    pub fn matches(&self) -> &[MatchRecord] {
        self.meta
            .as_ref()
            .map(|meta| meta.matches.as_slice())
            .unwrap_or(&[])
    }

    /// Whether the message reports a failure.
    pub fn is_error(&self) -> bool {
        self.meta.as_ref().is_some_and(|meta| meta.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn language_accepts_codes_and_aliases() {
        assert_eq!("en".parse::<Language>(), Ok(Language::Primary));
        assert_eq!("Secondary".parse::<Language>(), Ok(Language::Secondary));
        assert!("fr".parse::<Language>().is_err());

        let parsed: Language = serde_json::from_value(json!("primary")).expect("alias");
        assert_eq!(parsed, Language::Primary);
        assert_eq!(serde_json::to_value(Language::Secondary).expect("ser"), json!("ar"));
    }

    #[test]
    fn message_serializes_in_rendering_shape() {
        let message = Message::new(Role::User, "hello", None);
        let value = serde_json::to_value(&message).expect("serialize");
        let object = value.as_object().expect("object");
        assert!(object.contains_key("id"));
        assert!(object.contains_key("time"));
        assert_eq!(object.get("role"), Some(&json!("user")));
        assert!(!object.contains_key("meta"));
    }

    #[test]
    fn message_ids_are_unique() {
        let first = Message::new(Role::Assistant, "a", None);
        let second = Message::new(Role::Assistant, "a", None);
        assert_ne!(first.id, second.id);
    }
}
