//! UI-agnostic conversation state
//!
//! This module contains the data structures shared by every front end
//! (the TUI today) without depending on any specific UI framework.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Explanation and code extracted from one model reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedResult {
    pub explanation: String,
    pub code: String,
}

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    pub parsed: Option<GeneratedResult>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatMessage {
    fn new(role: ChatRole, content: String, parsed: Option<GeneratedResult>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            parsed,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Generated code carried by this message, if any and non-empty
    pub fn code(&self) -> Option<&str> {
        self.parsed
            .as_ref()
            .map(|p| p.code.as_str())
            .filter(|code| !code.is_empty())
    }
}

/// Append-only, ordered list of chat messages for one session.
///
/// Messages are never edited, removed or reordered once appended.
#[derive(Debug, Default, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_user(&mut self, text: impl Into<String>) -> &ChatMessage {
        self.push(ChatMessage::new(ChatRole::User, text.into(), None))
    }

    pub fn append_assistant(
        &mut self,
        content: impl Into<String>,
        parsed: Option<GeneratedResult>,
    ) -> &ChatMessage {
        self.push(ChatMessage::new(ChatRole::Assistant, content.into(), parsed))
    }

    /// All messages in display order
    pub fn all(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    fn push(&mut self, message: ChatMessage) -> &ChatMessage {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn appends_keep_call_order() {
        let mut conversation = Conversation::new();
        let mut expected = Vec::new();

        for i in 0..6 {
            if i % 3 == 0 {
                expected.push(conversation.append_user(format!("prompt {i}")).clone());
            } else {
                expected.push(conversation.append_assistant(format!("reply {i}"), None).clone());
            }
        }

        assert_eq!(conversation.len(), 6);
        assert_eq!(conversation.all(), expected.as_slice());
    }

    #[test]
    fn ids_are_unique() {
        let mut conversation = Conversation::new();
        for _ in 0..50 {
            conversation.append_user("same text");
        }

        let ids: HashSet<&str> = conversation.all().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn timestamps_never_go_backwards() {
        let mut conversation = Conversation::new();
        conversation.append_user("first");
        conversation.append_assistant("second", None);

        let all = conversation.all();
        assert!(all[0].timestamp <= all[1].timestamp);
        assert!(all[0].timestamp > 0);
    }

    #[test]
    fn assistant_message_carries_parsed_result() {
        let mut conversation = Conversation::new();
        let parsed = GeneratedResult {
            explanation: "A card.".to_string(),
            code: "class CardView {}".to_string(),
        };

        let message = conversation.append_assistant("A card.", Some(parsed.clone()));

        assert_eq!(message.role, ChatRole::Assistant);
        assert_eq!(message.parsed, Some(parsed));
        assert_eq!(message.code(), Some("class CardView {}"));
    }

    #[test]
    fn empty_code_is_not_reported() {
        let mut conversation = Conversation::new();
        let parsed = GeneratedResult {
            explanation: "Generated Code:".to_string(),
            code: String::new(),
        };

        let message = conversation.append_assistant("Generated Code:", Some(parsed));
        assert_eq!(message.code(), None);
    }
}
