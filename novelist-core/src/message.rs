//! Transcript message types.
//!
//! A conversation is an append-only sequence of immutable messages. Every
//! message records who authored it, when, and (for chat turns) which workflow
//! step the conversation was in at the time.

use crate::steps::CreatorStep;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of the message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Message typed by the user
    User,
    /// Reply from the model
    Model,
    /// Local notice (settings changes, configuration updates)
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Model => write!(f, "model"),
            Role::System => write!(f, "system"),
        }
    }
}

/// A single transcript entry. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Workflow step the conversation was in when this was created.
    pub step: Option<CreatorStep>,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a model message.
    pub fn model(content: impl Into<String>) -> Self {
        Self::with_role(Role::Model, content)
    }

    /// Create a system notice.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Tag the message with the workflow step it belongs to.
    pub fn at_step(mut self, step: CreatorStep) -> Self {
        self.step = Some(step);
        self
    }

    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            timestamp: now_millis(),
            step: None,
        }
    }
}

/// Current time as milliseconds since the Unix epoch.
///
/// Simple timestamp without a chrono dependency.
pub(crate) fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_ids_are_unique() {
        let a = Message::user("one");
        let b = Message::user("two");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_message_constructors() {
        let user = Message::user("hello");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.content, "hello");
        assert!(user.step.is_none());
        assert!(user.timestamp > 0);

        let model = Message::model("hi").at_step(CreatorStep::CoreSetting);
        assert_eq!(model.role, Role::Model);
        assert_eq!(model.step, Some(CreatorStep::CoreSetting));

        let system = Message::system("Configuration updated.");
        assert_eq!(system.role, Role::System);
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Model.to_string(), "model");
        assert_eq!(Role::System.to_string(), "system");
    }

    #[test]
    fn test_message_serde_roundtrip() {
        let message = Message::model("reply").at_step(CreatorStep::ChapterWriting);
        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();

        assert_eq!(back.id, message.id);
        assert_eq!(back.role, Role::Model);
        assert_eq!(back.content, "reply");
        assert_eq!(back.step, Some(CreatorStep::ChapterWriting));
    }
}
