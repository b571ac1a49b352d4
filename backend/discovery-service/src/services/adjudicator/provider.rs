// ============================================
// LLM providers
// ============================================

use crate::error::{DiscoveryError, Result};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat-completion backend used by the adjudicator and meaning extraction
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// One system + user exchange; returns the raw assistant text
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    fn name(&self) -> &str;
}

/// Inner text of a markdown code fence, or the whole response when unfenced
pub fn strip_code_fence(response: &str) -> &str {
    if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(response)
    } else if response.contains("```") {
        response.split("```").nth(1).unwrap_or(response)
    } else {
        response
    }
}

pub struct OpenAIProvider {
    client: HttpClient,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAIProvider {
    pub fn new(api_key: &str, model: &str, endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            endpoint: endpoint.to_string(),
        })
    }
}

#[derive(Serialize)]
struct OpenAICompletionRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAICompletionResponse {
    choices: Vec<OpenAIChoice>,
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

#[async_trait]
impl LlmProvider for OpenAIProvider {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = OpenAICompletionRequest {
            model: &self.model,
            messages: vec![
                OpenAIMessage {
                    role: "system",
                    content: system,
                },
                OpenAIMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| DiscoveryError::Transport(format!("OpenAI API error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DiscoveryError::Transport(format!(
                "OpenAI API error {}: {}",
                status, error_text
            )));
        }

        let result: OpenAICompletionResponse = response
            .json()
            .await
            .map_err(|e| DiscoveryError::Transport(format!("OpenAI response decode: {}", e)))?;

        Ok(result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "openai"
    }
}
