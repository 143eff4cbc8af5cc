//! Conversation state shared with the UI.
//!
//! The UI never mutates these types directly. It reads a
//! [`ConversationSnapshot`] and follows [`ConversationEvent`]s published by
//! the controller.

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Controller-wide state gating input and the stop button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Ready for the next question.
    #[default]
    Idle,
    /// Waiting on the answer provider.
    Loading,
    /// Typing out the answer.
    Animating,
}

impl Phase {
    /// Human-readable display string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Loading => "Searching",
            Self::Animating => "Answering",
        }
    }

    /// Whether a generation is in progress.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Point-in-time copy of everything the UI renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    /// Current input buffer.
    pub input_text: String,
    /// Messages in display order.
    pub messages: Vec<Message>,
    /// Current phase.
    pub phase: Phase,
}

impl ConversationSnapshot {
    /// Whether a generation is in progress.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }

    /// Whether the input field should reject edits.
    #[must_use]
    pub const fn is_input_locked(&self) -> bool {
        self.is_busy()
    }

    /// Whether the stop button should be shown.
    #[must_use]
    pub const fn show_stop_button(&self) -> bool {
        self.is_busy()
    }

    /// Whether pressing send would start a generation.
    #[must_use]
    pub fn can_send(&self) -> bool {
        !self.is_busy() && !self.input_text.trim().is_empty()
    }

    /// The latest assistant message, if any.
    #[must_use]
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| !m.is_user())
    }
}

/// Change notification published by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    /// The input buffer changed.
    InputChanged(String),
    /// A message was appended to the conversation.
    MessageAppended(Message),
    /// An existing message changed its text or flags.
    MessageUpdated(Message),
    /// The phase changed.
    PhaseChanged(Phase),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        let snapshot = ConversationSnapshot::default();
        assert_eq!(snapshot.phase, Phase::Idle);
        assert!(!snapshot.is_busy());
        assert!(!snapshot.show_stop_button());
    }

    #[test]
    fn can_send_requires_text_and_idle() {
        let mut snapshot = ConversationSnapshot {
            input_text: "   ".to_string(),
            ..Default::default()
        };
        assert!(!snapshot.can_send());

        snapshot.input_text = "rust async".to_string();
        assert!(snapshot.can_send());

        snapshot.phase = Phase::Loading;
        assert!(!snapshot.can_send());
        assert!(snapshot.is_input_locked());
        assert!(snapshot.show_stop_button());
    }

    #[test]
    fn last_assistant_skips_user_messages() {
        let placeholder = Message::assistant_placeholder();
        let snapshot = ConversationSnapshot {
            messages: vec![Message::user("hi"), placeholder.clone(), Message::user("again")],
            ..Default::default()
        };
        assert_eq!(snapshot.last_assistant().map(|m| m.id), Some(placeholder.id));
    }
}
