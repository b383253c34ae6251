/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for the supported services:
 * - Google: Cloud Translation v2, or the keyless web endpoint
 * - OpenAI: chat completions (also used for LM Studio)
 * - Anthropic: messages API
 * - Ollama: local LLM server
 * - Mock: scripted behaviours for tests
 *
 * Providers only see masked text. Everything around a single call
 * (retries, fallback, throttling) lives in `translation::adapter`.
 */

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{ProviderConfig, TranslationCommonConfig, TranslationProvider};
use crate::errors::ProviderError;
use crate::language_utils;

pub mod anthropic;
pub mod google;
pub mod mock;
pub mod ollama;
pub mod openai;

/// A single value to translate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    /// Masked text
    pub text: String,
    /// Source language code, or `auto`
    pub source_language: String,
    /// Target language code
    pub target_language: String,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, source_language: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
        }
    }
}

/// Common trait for all translation providers
///
/// Implementations are stateless with respect to a run and can be shared
/// between concurrent tasks behind an `Arc`.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Short name used in logs and the manifest
    fn name(&self) -> &str;

    /// Translate one masked value
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The translated text, never empty
    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;
}

/// Fill the `{source_language}` and `{target_language}` placeholders of a
/// system prompt with language names
pub fn render_system_prompt(template: &str, request: &TranslationRequest) -> String {
    let source = language_utils::get_language_name(&request.source_language)
        .unwrap_or_else(|_| request.source_language.clone());
    let target = language_utils::get_language_name(&request.target_language)
        .unwrap_or_else(|_| request.target_language.clone());

    template
        .replace("{source_language}", &source)
        .replace("{target_language}", &target)
}

/// Reject blank provider output
pub(crate) fn non_empty(text: String) -> Result<String, ProviderError> {
    if text.trim().is_empty() {
        Err(ProviderError::EmptyResponse)
    } else {
        Ok(text)
    }
}

/// Build the HTTP client shared by the network providers
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_default()
}

/// Read a failed HTTP response into the matching provider error
pub(crate) async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    ProviderError::from_status(status, body)
}

/// Create the provider client for one entry of the fallback chain
pub fn build_provider(
    kind: TranslationProvider,
    settings: &ProviderConfig,
    common: &TranslationCommonConfig,
) -> Result<Arc<dyn Provider>> {
    let timeout = Duration::from_secs(common.timeout_secs);

    let provider: Arc<dyn Provider> = match kind {
        TranslationProvider::Google => Arc::new(google::Google::new(
            settings.api_key.clone(),
            settings.endpoint.clone(),
            timeout,
        )),
        TranslationProvider::OpenAI | TranslationProvider::LMStudio => {
            if kind.requires_api_key() && settings.api_key.trim().is_empty() {
                return Err(anyhow!("{} requires an API key", kind.display_name()));
            }
            Arc::new(
                openai::OpenAI::new(
                    kind.display_name(),
                    settings.api_key.clone(),
                    settings.endpoint.clone(),
                    settings.model.clone(),
                    timeout,
                )
                .with_prompt(common.system_prompt.clone(), common.temperature),
            )
        }
        TranslationProvider::Anthropic => {
            if settings.api_key.trim().is_empty() {
                return Err(anyhow!("{} requires an API key", kind.display_name()));
            }
            Arc::new(
                anthropic::Anthropic::new(
                    settings.api_key.clone(),
                    settings.endpoint.clone(),
                    settings.model.clone(),
                    timeout,
                )
                .with_prompt(common.system_prompt.clone(), common.temperature),
            )
        }
        TranslationProvider::Ollama => Arc::new(
            ollama::Ollama::new(settings.endpoint.clone(), settings.model.clone(), timeout)
                .with_prompt(common.system_prompt.clone(), common.temperature),
        ),
    };

    Ok(provider)
}
