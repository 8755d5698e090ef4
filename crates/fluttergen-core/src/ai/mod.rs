//! Model backends
//!
//! Every hosted (or local) model API sits behind [`TextGenerator`], so the
//! generator and the UI never depend on a provider's wire format.

pub mod claude;
pub mod gemini;
pub mod ollama;
pub mod openai;

use anyhow::Result;
use async_trait::async_trait;

pub use claude::ClaudeClient;
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;

/// A single, context-free completion request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
}

/// A backend that turns one request into raw reply text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send the request and return the reply text.
    ///
    /// A successful response without any text yields an empty string.
    async fn complete(&self, request: &GenerationRequest) -> Result<String>;
}
