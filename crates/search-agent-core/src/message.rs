//! Chat message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::MessageId;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Question typed by the user.
    User,
    /// Answer produced by the search agent.
    Assistant,
}

impl Role {
    /// Human-readable display string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Assistant => "Agent",
        }
    }
}

/// A single entry in the conversation.
///
/// Only the most recently appended assistant message is ever in flight
/// (`is_loading` or `is_animating`); all others are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Stable identity of the message.
    pub id: MessageId,
    /// Who wrote the message.
    pub role: Role,
    /// Current text. Grows character by character while animating.
    pub text: String,
    /// Waiting on the answer provider.
    pub is_loading: bool,
    /// Answer is being typed out.
    pub is_animating: bool,
    /// When the message was appended.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::User,
            text: text.into(),
            is_loading: false,
            is_animating: false,
            created_at: Utc::now(),
        }
    }

    /// Create the empty, loading assistant message appended on send.
    #[must_use]
    pub fn assistant_placeholder() -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::Assistant,
            text: String::new(),
            is_loading: true,
            is_animating: false,
            created_at: Utc::now(),
        }
    }

    /// Check if this is a user message.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Check if the message is still loading or animating.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        self.is_loading || self.is_animating
    }

    /// Mark the message as stopped by the user.
    ///
    /// Keeps any partially typed text; an empty answer is replaced with
    /// `stopped_text`. Applying it twice is the same as applying it once.
    pub fn finalize_stopped(&mut self, stopped_text: &str) {
        self.is_loading = false;
        self.is_animating = false;
        if self.text.trim().is_empty() {
            self.text = stopped_text.to_string();
        }
    }

    /// Mark the message as failed, replacing its text with the error.
    pub fn finalize_failed(&mut self, description: &str) {
        self.is_loading = false;
        self.is_animating = false;
        self.text = format!("Error: {description}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_starts_loading() {
        let msg = Message::assistant_placeholder();
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.text.is_empty());
        assert!(msg.is_loading);
        assert!(!msg.is_animating);
        assert!(msg.is_in_flight());
    }

    #[test]
    fn user_message_is_terminal() {
        let msg = Message::user("what is rust?");
        assert!(msg.is_user());
        assert!(!msg.is_in_flight());
    }

    #[test]
    fn stopped_replaces_blank_text() {
        let mut msg = Message::assistant_placeholder();
        msg.text = "  \n".to_string();
        msg.finalize_stopped("Generation stopped.");
        assert_eq!(msg.text, "Generation stopped.");
        assert!(!msg.is_in_flight());
    }

    #[test]
    fn stopped_keeps_partial_text() {
        let mut msg = Message::assistant_placeholder();
        msg.is_loading = false;
        msg.is_animating = true;
        msg.text = "Partial ans".to_string();
        msg.finalize_stopped("Generation stopped.");
        msg.finalize_stopped("Generation stopped.");
        assert_eq!(msg.text, "Partial ans");
        assert!(!msg.is_in_flight());
    }

    #[test]
    fn failed_prefixes_description() {
        let mut msg = Message::assistant_placeholder();
        msg.finalize_failed("bad server response (status 500)");
        assert_eq!(msg.text, "Error: bad server response (status 500)");
        assert!(!msg.is_in_flight());
    }

    #[test]
    fn role_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    }
}
