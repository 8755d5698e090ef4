use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{Context, Result, anyhow};

use crate::ai::{ollama::DEFAULT_OLLAMA_URL, ClaudeClient, GeminiClient, OllamaClient, OpenAIClient, TextGenerator};
use crate::provider::Provider;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub default_model: Option<String>,
    pub gemini_api_key: Option<String>,
    pub claude_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub ollama_url: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some(Provider::Gemini.as_str().to_string()),
            ..Self::default()
        }
    }

    /// Load from the user config directory, or defaults if no file exists yet
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Like [`Config::load`], but an unreadable file is logged and replaced by defaults
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Using default config: {:#}", e);
            Self::new()
        })
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    pub fn save_default_model(model: &str) -> Result<()> {
        let mut config = Self::load_or_default();
        config.default_model = Some(model.to_string());
        config.save()
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("fluttergen").join("config.json"))
    }

    /// Provider named in the file, falling back to Gemini
    pub fn provider(&self) -> Provider {
        self.provider
            .as_deref()
            .and_then(Provider::from_str)
            .unwrap_or(Provider::Gemini)
    }

    pub fn set_provider(&mut self, provider: Provider) {
        self.provider = Some(provider.as_str().to_string());
    }

    pub fn stored_api_key(&self, provider: Provider) -> Option<&str> {
        let key = match provider {
            Provider::Gemini => &self.gemini_api_key,
            Provider::Claude => &self.claude_api_key,
            Provider::OpenAI => &self.openai_api_key,
            Provider::Ollama => return None,
        };
        key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn set_api_key(&mut self, provider: Provider, key: &str) {
        let slot = match provider {
            Provider::Gemini => &mut self.gemini_api_key,
            Provider::Claude => &mut self.claude_api_key,
            Provider::OpenAI => &mut self.openai_api_key,
            Provider::Ollama => return,
        };
        *slot = Some(key.to_string());
    }

    /// API key for a provider: environment variables first, then the file
    pub fn api_key(&self, provider: Provider) -> Option<String> {
        self.api_key_with_env(provider, |name| std::env::var(name).ok())
    }

    pub fn api_key_with_env<F>(&self, provider: Provider, env: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        provider
            .key_env_vars()
            .iter()
            .filter_map(|name| env(name))
            .find(|value| !value.is_empty())
            .or_else(|| self.stored_api_key(provider).map(str::to_string))
    }

    /// Where the key for a provider comes from: "env", "config", "local" or None
    pub fn key_source(&self, provider: Provider) -> Option<&'static str> {
        if !provider.needs_api_key() {
            return Some("local");
        }
        if provider
            .key_env_vars()
            .iter()
            .any(|name| std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false))
        {
            Some("env")
        } else if self.stored_api_key(provider).is_some() {
            Some("config")
        } else {
            None
        }
    }

    pub fn ollama_url(&self) -> String {
        std::env::var("OLLAMA_URL")
            .ok()
            .or_else(|| self.ollama_url.clone())
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
    }

    /// Model from the file when it belongs to `provider`, else the provider default
    pub fn model_for(&self, provider: Provider) -> String {
        match &self.default_model {
            Some(model) if provider == self.provider() => model.clone(),
            _ => provider.default_model(),
        }
    }

    /// Build the backend for a provider.
    ///
    /// A missing key is not an error here; the request fails when sent.
    pub fn backend_for(&self, provider: Provider) -> Arc<dyn TextGenerator> {
        let key = self.api_key(provider).unwrap_or_default();
        if key.is_empty() && provider.needs_api_key() {
            tracing::warn!(provider = provider.as_str(), "no API key configured");
        }

        match provider {
            Provider::Gemini => Arc::new(GeminiClient::new(&key)),
            Provider::Claude => Arc::new(ClaudeClient::new(&key)),
            Provider::OpenAI => Arc::new(OpenAIClient::new(&key)),
            Provider::Ollama => Arc::new(OllamaClient::new(&self.ollama_url())),
        }
    }
}
