use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{GenerationRequest, TextGenerator};

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    temperature: f32,
    messages: Vec<OpenAIMessage>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

impl OpenAIRequest {
    fn from_request(request: &GenerationRequest) -> Self {
        Self {
            model: request.model.clone(),
            temperature: request.temperature,
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
        }
    }
}

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
}

impl OpenAIClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
        }
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "gpt-4o".to_string(),
            "gpt-4o-mini".to_string(),
            "gpt-4-turbo".to_string(),
        ]
    }
}

#[async_trait]
impl TextGenerator for OpenAIClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<String> {
        let response = self.client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&OpenAIRequest::from_request(request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenAI API error {}: {}", status, text));
        }

        let openai_response: OpenAIResponse = response.json().await?;
        Ok(openai_response.choices.first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn system_instruction_is_first_message() {
        let request = GenerationRequest {
            model: "gpt-4o".to_string(),
            system: "persona".to_string(),
            prompt: "Chat screen".to_string(),
            temperature: 0.2,
        };

        let body = serde_json::to_value(OpenAIRequest::from_request(&request)).unwrap();

        assert_eq!(
            body["messages"],
            json!([
                { "role": "system", "content": "persona" },
                { "role": "user", "content": "Chat screen" }
            ])
        );
        assert_eq!(body["temperature"], json!(0.2_f32));
    }

    #[test]
    fn null_content_reads_as_empty() {
        let response: OpenAIResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "content": null } }]
        }))
        .unwrap();

        assert_eq!(response.choices[0].message.content, None);
    }
}
