pub mod ai;
pub mod config;
pub mod cues;
pub mod generator;
pub mod parser;
pub mod provider;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use ai::{ClaudeClient, GeminiClient, GenerationRequest, OllamaClient, OpenAIClient, TextGenerator};
pub use config::Config;
pub use cues::{CopyAcknowledgement, ScrollCue, COPY_ACK_DURATION};
pub use generator::{GenerationError, Generator};
pub use parser::{parse_response, DEFAULT_LANGUAGE};
pub use provider::Provider;
pub use session::{Session, ERROR_MESSAGE, SUGGESTIONS};
pub use state::{ChatMessage, ChatRole, Conversation, GeneratedResult};
