use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Provider, TranslationRequest, error_from_response, http_client, non_empty, render_system_prompt};
use crate::errors::ProviderError;

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    client: Client,
    model: String,
    system_prompt: String,
    temperature: f32,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    model: String,
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    /// How long to keep the model loaded in memory
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
}

/// Generation options for the Ollama API
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub model: String,
    /// Generated text
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: None,
            keep_alive: None,
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).temperature = Some(temperature);
        self
    }

    pub fn num_predict(mut self, num_predict: u32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).num_predict = Some(num_predict);
        self
    }

    pub fn keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }

    /// Ask for a single JSON object instead of a stream
    pub fn no_stream(mut self) -> Self {
        self.stream = Some(false);
        self
    }
}

impl Ollama {
    /// Create a new Ollama client from a base URL such as `http://localhost:11434`
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http_client(timeout),
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

    /// Generate text from the Ollama API
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body = response.text().await?;
        Self::parse_generation(&body)
    }

    /// Parse a generate answer.
    ///
    /// Some Ollama versions stream JSON lines even when asked not to; in
    /// that case the `response` pieces of every line are concatenated.
    pub fn parse_generation(body: &str) -> Result<GenerationResponse, ProviderError> {
        if let Ok(single) = serde_json::from_str::<GenerationResponse>(body) {
            return Ok(single);
        }

        let preview: String = body.chars().take(200).collect();
        warn!("Ollama answered with a non-object body, trying JSON lines: {}", preview);

        let mut merged = GenerationResponse {
            model: String::new(),
            response: String::new(),
            done: false,
        };
        let mut parsed_any = false;
        for line in body.lines().filter(|l| !l.trim().is_empty()) {
            let part = serde_json::from_str::<GenerationResponse>(line)
                .map_err(|e| ProviderError::ParseError(format!("Invalid Ollama response line: {}", e)))?;
            parsed_any = true;
            merged.response.push_str(&part.response);
            merged.done |= part.done;
            if merged.model.is_empty() {
                merged.model = part.model;
            }
        }

        if parsed_any {
            Ok(merged)
        } else {
            Err(ProviderError::ParseError("Empty Ollama response body".to_string()))
        }
    }

    /// Get the Ollama API version
    pub async fn version(&self) -> Result<String, ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let value: serde_json::Value = response.json().await?;
        value["version"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::ParseError("Invalid version format in response".to_string()))
    }
}

#[async_trait]
impl Provider for Ollama {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        let generation = GenerationRequest::new(&self.model, &request.text)
            .system(render_system_prompt(&self.system_prompt, request))
            .temperature(self.temperature)
            .no_stream();

        let response = self.generate(&generation).await?;
        non_empty(response.response.trim().to_string())
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let version = self.version().await?;
        debug!("Connected to Ollama {}", version);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generationRequest_chained_shouldSerializeOptions() {
        let request = GenerationRequest::new("llama3.2:3b", "Ciao [#001]")
            .system("You are a translator")
            .temperature(0.25)
            .no_stream();
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "llama3.2:3b",
                "prompt": "Ciao [#001]",
                "system": "You are a translator",
                "options": {"temperature": 0.25},
                "stream": false
            })
        );
    }

    #[test]
    fn test_parseGeneration_withSingleObject_shouldReturnIt() {
        let parsed = Ollama::parse_generation(r#"{"model":"m","response":"Hallo","done":true}"#).unwrap();
        assert_eq!(parsed.response, "Hallo");
        assert!(parsed.done);
    }

    #[test]
    fn test_parseGeneration_withJsonLines_shouldConcatenate() {
        let body = "{\"model\":\"m\",\"response\":\"Hal\",\"done\":false}\n{\"model\":\"m\",\"response\":\"lo\",\"done\":true}\n";
        let parsed = Ollama::parse_generation(body).unwrap();
        assert_eq!(parsed.response, "Hallo");
        assert_eq!(parsed.model, "m");
    }

    #[test]
    fn test_parseGeneration_withGarbage_shouldBeParseError() {
        assert!(matches!(
            Ollama::parse_generation("<html>"),
            Err(ProviderError::ParseError(_))
        ));
    }
}
