use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Provider, TranslationRequest, error_from_response, http_client, non_empty, render_system_prompt};
use crate::errors::ProviderError;

// @const: Messages API version header
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic client for the messages API
#[derive(Debug)]
pub struct Anthropic {
    client: Client,
    api_key: String,
    /// Base URL (defaults to the public API)
    endpoint: String,
    model: String,
    system_prompt: String,
    temperature: f32,
}

/// Anthropic message request
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

/// Anthropic message format
#[derive(Debug, Serialize, Deserialize)]
pub struct AnthropicMessage {
    /// Role of the message sender (user, assistant)
    pub role: String,
    pub content: String,
}

/// Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    pub content: Vec<AnthropicContent>,
}

/// Individual content block in an Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: String,
}

impl AnthropicRequest {
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            system: None,
            temperature: None,
            max_tokens,
        }
    }

    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(AnthropicMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl Anthropic {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: http_client(timeout),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            system_prompt: String::new(),
            temperature: 0.3,
        }
    }

    /// Set the system prompt template and sampling temperature
    pub fn with_prompt(mut self, system_prompt: impl Into<String>, temperature: f32) -> Self {
        self.system_prompt = system_prompt.into();
        self.temperature = temperature;
        self
    }

    fn messages_url(&self) -> String {
        if self.endpoint.is_empty() {
            "https://api.anthropic.com/v1/messages".to_string()
        } else {
            format!("{}/v1/messages", self.endpoint.trim_end_matches('/'))
        }
    }

    /// Complete a messages request
    pub async fn complete(&self, request: &AnthropicRequest) -> Result<AnthropicResponse, ProviderError> {
        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json::<AnthropicResponse>().await?)
    }

    /// Concatenated text blocks of a response
    pub fn extract_text(response: &AnthropicResponse) -> String {
        response
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect::<String>()
            .trim()
            .to_string()
    }
}

#[async_trait]
impl Provider for Anthropic {
    fn name(&self) -> &str {
        "Anthropic"
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        // Values are short; leave room for languages that expand
        let max_tokens = (request.text.len() as u32).saturating_mul(4).clamp(256, 4096);
        let message = AnthropicRequest::new(&self.model, max_tokens)
            .system(render_system_prompt(&self.system_prompt, request))
            .add_message("user", &request.text)
            .temperature(self.temperature);

        let response = self.complete(&message).await?;
        non_empty(Self::extract_text(&response))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let message = AnthropicRequest::new(&self.model, 10).add_message("user", "Hello");
        self.complete(&message).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extractText_shouldSkipNonTextBlocks() {
        let raw = r#"{"content":[{"type":"text","text":"Ciao "},{"type":"tool_use"},{"type":"text","text":"[#001]"}]}"#;
        let response: AnthropicResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(Anthropic::extract_text(&response), "Ciao [#001]");
    }

    #[test]
    fn test_messagesUrl_withCustomEndpoint_shouldAppendPath() {
        let client = Anthropic::new("k", "https://proxy.local/", "m", Duration::from_secs(1));
        assert_eq!(client.messages_url(), "https://proxy.local/v1/messages");
    }

    #[test]
    fn test_anthropicRequest_shouldCarrySystemPrompt() {
        let request = AnthropicRequest::new("claude", 100).system("Translate").add_message("user", "Hi");
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["system"], "Translate");
        assert_eq!(body["messages"][0]["content"], "Hi");
        assert!(body.get("temperature").is_none());
    }
}
