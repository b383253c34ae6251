/*!
 * Google Translate client.
 *
 * With an API key the Cloud Translation v2 REST API is used. Without one
 * the client falls back to the keyless web endpoint, which answers with
 * nested JSON arrays instead of an object.
 */

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::{Provider, TranslationRequest, error_from_response, http_client, non_empty};
use crate::errors::ProviderError;
use crate::language_utils;

// @const: Keyless web endpoint
pub const GOOGLE_WEB_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

// @const: Cloud Translation v2 endpoint
pub const GOOGLE_API_ENDPOINT: &str = "https://translation.googleapis.com/language/translate/v2";

/// Google Translate client
#[derive(Debug)]
pub struct Google {
    client: Client,
    api_key: String,
    endpoint: String,
}

/// Cloud Translation v2 request body
#[derive(Debug, Serialize)]
pub struct GoogleRequest {
    pub q: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub format: String,
}

/// Cloud Translation v2 response
#[derive(Debug, Deserialize)]
pub struct GoogleResponse {
    pub data: GoogleResponseData,
}

#[derive(Debug, Deserialize)]
pub struct GoogleResponseData {
    pub translations: Vec<GoogleTranslation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleTranslation {
    pub translated_text: String,
    #[serde(default)]
    pub detected_source_language: Option<String>,
}

impl GoogleRequest {
    pub fn new(text: impl Into<String>, source: &str, target: &str) -> Self {
        Self {
            q: text.into(),
            target: target.to_string(),
            source: (!language_utils::is_auto(source)).then(|| source.to_string()),
            format: "text".to_string(),
        }
    }
}

impl Google {
    /// Create a client; an empty `api_key` selects the keyless endpoint
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, timeout: Duration) -> Self {
        let endpoint = endpoint.into();
        Self {
            client: http_client(timeout),
            api_key: api_key.into(),
            endpoint: if endpoint.trim().is_empty() {
                GOOGLE_API_ENDPOINT.to_string()
            } else {
                endpoint
            },
        }
    }

    fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Build the keyless web endpoint URL for a request
    pub fn web_url(text: &str, source: &str, target: &str) -> Result<Url, ProviderError> {
        Url::parse_with_params(
            GOOGLE_WEB_ENDPOINT,
            &[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ],
        )
        .map_err(|e| ProviderError::RequestFailed(format!("Invalid Google URL: {}", e)))
    }

    /// Concatenate the translated segments of a web endpoint answer.
    ///
    /// The answer looks like `[[["Ciao ","Hello ",...],["mondo","world",...]],null,"en"]`.
    pub fn parse_web_response(value: &Value) -> Result<String, ProviderError> {
        let segments = value
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::ParseError("Missing translation segments".to_string()))?;

        let text: String = segments
            .iter()
            .filter_map(|segment| segment.get(0).and_then(Value::as_str))
            .collect();
        non_empty(text)
    }

    async fn translate_with_key(&self, text: &str, source: &str, target: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&GoogleRequest::new(text, source, target))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body = response.json::<GoogleResponse>().await?;
        let translation = body
            .data
            .translations
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;
        non_empty(translation.translated_text)
    }

    async fn translate_keyless(&self, text: &str, source: &str, target: &str) -> Result<String, ProviderError> {
        let url = Self::web_url(text, source, target)?;
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let value = response.json::<Value>().await?;
        Self::parse_web_response(&value)
    }
}

#[async_trait]
impl Provider for Google {
    fn name(&self) -> &str {
        "Google Translate"
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        let source = language_utils::provider_language_code(&request.source_language)
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let target = language_utils::provider_language_code(&request.target_language)
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        debug!("Google request {} -> {} ({} chars)", source, target, request.text.len());
        if self.has_key() {
            self.translate_with_key(&request.text, &source, &target).await
        } else {
            self.translate_keyless(&request.text, &source, &target).await
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = TranslationRequest::new("Hello", "en", "it");
        self.translate(&request).await.map(|_| ())
    }
}
