//! Submission flow for one chat session
//!
//! Owns the conversation and the single in-flight flag. Front ends call
//! [`Session::submit`] when the user sends text, run the returned prompt
//! through a [`crate::Generator`], then hand the outcome to
//! [`Session::resolve`].

use crate::generator::GenerationError;
use crate::state::{Conversation, GeneratedResult};

/// Assistant message shown when a generation call fails
pub const ERROR_MESSAGE: &str =
    "I encountered an error generating the code. Please verify your API Key or try a different description.";

/// Prompts offered while the conversation is empty
pub const SUGGESTIONS: [&str; 4] = [
    "E-commerce Product Detail Page",
    "Social Media Profile with GridView",
    "Crypto Wallet Dashboard",
    "Music Player with Glassmorphism",
];

#[derive(Debug, Default)]
pub struct Session {
    conversation: Conversation,
    pending: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// True while a request is in flight
    pub fn is_loading(&self) -> bool {
        self.pending
    }

    /// Accept user text for sending.
    ///
    /// Returns the trimmed prompt after appending it as a user message, or
    /// `None` (appending nothing) when the text is blank or a request is
    /// already in flight.
    pub fn submit(&mut self, text: &str) -> Option<String> {
        let prompt = text.trim();
        if prompt.is_empty() || self.pending {
            return None;
        }

        self.conversation.append_user(prompt);
        self.pending = true;
        Some(prompt.to_string())
    }

    /// Record the outcome of the in-flight request as one assistant message.
    ///
    /// Ignored when nothing is in flight.
    pub fn resolve(&mut self, outcome: Result<GeneratedResult, GenerationError>) {
        if !self.pending {
            tracing::warn!("generation result arrived with no request in flight");
            return;
        }
        self.pending = false;

        match outcome {
            Ok(result) => {
                self.conversation
                    .append_assistant(result.explanation.clone(), Some(result));
            }
            Err(e) => {
                tracing::debug!("showing error message for failed generation: {}", e);
                self.conversation.append_assistant(ERROR_MESSAGE, None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ChatRole;
    use anyhow::anyhow;
    use pretty_assertions::assert_eq;

    fn login_result() -> GeneratedResult {
        GeneratedResult {
            explanation: "Here is a login screen.".to_string(),
            code: "class Login {}".to_string(),
        }
    }

    #[test]
    fn blank_input_is_rejected() {
        let mut session = Session::new();

        assert_eq!(session.submit(""), None);
        assert_eq!(session.submit("   \n\t "), None);
        assert!(session.conversation().is_empty());
        assert!(!session.is_loading());
    }

    #[test]
    fn submit_trims_and_appends_user_message() {
        let mut session = Session::new();

        let prompt = session.submit("  Login screen \n");

        assert_eq!(prompt.as_deref(), Some("Login screen"));
        assert!(session.is_loading());
        let messages = session.conversation().all();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[0].content, "Login screen");
    }

    #[test]
    fn submit_while_pending_is_a_no_op() {
        let mut session = Session::new();
        session.submit("Login screen");

        assert_eq!(session.submit("Another screen"), None);
        assert_eq!(session.conversation().len(), 1);

        session.resolve(Ok(login_result()));
        assert!(session.submit("Another screen").is_some());
        assert_eq!(session.conversation().len(), 3);
    }

    #[test]
    fn failure_appends_fixed_error_message() {
        let mut session = Session::new();
        session.submit("Login screen");

        session.resolve(Err(GenerationError::Failed(anyhow!("connection refused"))));

        let messages = session.conversation().all();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, ChatRole::Assistant);
        assert_eq!(messages[1].content, ERROR_MESSAGE);
        assert_eq!(messages[1].parsed, None);
        assert!(!session.is_loading());
    }

    #[test]
    fn success_appends_explanation_and_result() {
        let mut session = Session::new();
        session.submit("Login screen");

        session.resolve(Ok(login_result()));

        let reply = session.conversation().last().unwrap();
        assert_eq!(reply.role, ChatRole::Assistant);
        assert_eq!(reply.content, "Here is a login screen.");
        assert_eq!(reply.parsed, Some(login_result()));
    }

    #[test]
    fn stray_resolution_is_ignored() {
        let mut session = Session::new();

        session.resolve(Ok(login_result()));

        assert!(session.conversation().is_empty());
    }

    #[test]
    fn conversation_stays_usable_after_failure() {
        let mut session = Session::new();
        session.submit("First");
        session.resolve(Err(GenerationError::Failed(anyhow!("timeout"))));

        assert_eq!(session.submit("Second").as_deref(), Some("Second"));
        session.resolve(Ok(login_result()));

        let roles: Vec<ChatRole> = session.conversation().all().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::User, ChatRole::Assistant, ChatRole::User, ChatRole::Assistant]
        );
    }
}
