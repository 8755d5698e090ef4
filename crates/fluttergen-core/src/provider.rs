use crate::ai::{ClaudeClient, GeminiClient, OpenAIClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Claude,
    OpenAI,
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Claude => "claude",
            Provider::OpenAI => "openai",
            Provider::Ollama => "ollama",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(Provider::Gemini),
            "claude" | "anthropic" => Some(Provider::Claude),
            "openai" => Some(Provider::OpenAI),
            "ollama" => Some(Provider::Ollama),
            _ => None,
        }
    }

    pub fn all() -> Vec<Provider> {
        vec![Provider::Gemini, Provider::Claude, Provider::OpenAI, Provider::Ollama]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini (Google)",
            Provider::Claude => "Claude (Anthropic)",
            Provider::OpenAI => "ChatGPT (OpenAI)",
            Provider::Ollama => "Ollama (Local)",
        }
    }

    /// Environment variables checked for this provider's key, in order
    pub fn key_env_vars(&self) -> &'static [&'static str] {
        match self {
            Provider::Gemini => &["GEMINI_API_KEY", "API_KEY"],
            Provider::Claude => &["ANTHROPIC_API_KEY"],
            Provider::OpenAI => &["OPENAI_API_KEY"],
            Provider::Ollama => &[],
        }
    }

    pub fn needs_api_key(&self) -> bool {
        !matches!(self, Provider::Ollama)
    }

    /// Models offered in the picker. Ollama models are discovered at runtime.
    pub fn known_models(&self) -> Vec<String> {
        match self {
            Provider::Gemini => GeminiClient::list_models(),
            Provider::Claude => ClaudeClient::list_models(),
            Provider::OpenAI => OpenAIClient::list_models(),
            Provider::Ollama => Vec::new(),
        }
    }

    pub fn default_model(&self) -> String {
        match self {
            Provider::Ollama => "qwen2.5-coder:latest".to_string(),
            _ => self.known_models().into_iter().next().unwrap_or_default(),
        }
    }
}
