//! Generation client
//!
//! Wraps a [`TextGenerator`] backend with the fixed persona, the response
//! format contract and a low sampling temperature. Each call is stateless:
//! only the current prompt is sent.

use std::sync::Arc;

use thiserror::Error;

use crate::ai::{GenerationRequest, TextGenerator};
use crate::parser::{parse_response, CODE_END, CODE_START};
use crate::state::GeneratedResult;

/// Sampling temperature for every request. Kept low for repeatable code.
pub const TEMPERATURE: f32 = 0.2;

/// Persona and mandatory reply format sent as the system instruction
pub const SYSTEM_INSTRUCTION: &str = concat!(
    "You are a senior Flutter developer and UI/UX designer.\n",
    "Your task: when the user describes a feature or a screen, produce complete, modern and clean Flutter (Dart) source code.\n",
    "\n",
    "Technical requirements:\n",
    "1. Use Material 3 and follow modern design principles (large border radius, sensible padding, harmonious colors).\n",
    "2. Use common widgets such as ListView, GridView, Stack, and Container with BoxDecoration.\n",
    "3. Organize the code well: split parts into separate widgets when that makes them easier to manage.\n",
    "4. Always use mock data so the screen looks complete (for example product lists, images from 'https://picsum.photos/id/[id]/[width]/[height]').\n",
    "5. Provide ThemeData as well when the user asks for a specific color scheme.\n",
    "\n",
    "MANDATORY reply format:\n",
    "1. A short explanation of the design idea (2-3 sentences).\n",
    "2. The separator line \"---CODE_START---\"\n",
    "3. All of the code in one single block.\n",
    "4. The separator line \"---CODE_END---\"\n",
);

/// The only failure a generation call reports
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Failed to generate Flutter code. Please check your API key or try again.")]
    Failed(#[source] anyhow::Error),
}

/// Sends prompts to a model backend and parses the replies
#[derive(Clone)]
pub struct Generator {
    backend: Arc<dyn TextGenerator>,
    model: String,
}

impl Generator {
    pub fn new(backend: Arc<dyn TextGenerator>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the outbound request for one prompt
    pub fn request_for(&self, prompt: &str) -> GenerationRequest {
        GenerationRequest {
            model: self.model.clone(),
            system: SYSTEM_INSTRUCTION.to_string(),
            prompt: prompt.to_string(),
            temperature: TEMPERATURE,
        }
    }

    /// Generate code for a prompt. No retries; any backend error becomes
    /// [`GenerationError::Failed`].
    pub async fn generate(&self, prompt: &str) -> Result<GeneratedResult, GenerationError> {
        let request = self.request_for(prompt);
        tracing::debug!(model = %self.model, prompt_chars = prompt.chars().count(), "sending generation request");

        match self.backend.complete(&request).await {
            Ok(text) => {
                let has_markers = text.contains(CODE_START) && text.contains(CODE_END);
                tracing::info!(model = %self.model, reply_chars = text.chars().count(), has_markers, "generation completed");
                Ok(parse_response(&text))
            }
            Err(e) => {
                tracing::error!(model = %self.model, error = %e, "generation failed");
                Err(GenerationError::Failed(e))
            }
        }
    }
}
