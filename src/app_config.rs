use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::Path;

use crate::shield::TokenShield;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO), or `auto`
    pub source_language: String,

    /// Target language code (ISO)
    pub target_language: String,

    /// Translation config
    pub translation: TranslationConfig,

    /// Token protection settings
    #[serde(default)]
    pub shield: ShieldConfig,

    /// Keys whose values may legitimately be empty after translation
    #[serde(default)]
    pub intentionally_blank: Vec<String>,

    /// Copy the input to `<file>.bak` before it is overwritten or repaired
    #[serde(default = "default_true")]
    pub backup: bool,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Google Cloud Translation v2
    #[default]
    Google,
    // @provider: Ollama
    Ollama,
    // @provider: OpenAI
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Google => "Google Translate",
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Google => "google".to_string(),
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    /// Whether the provider needs an API key (Google falls back to its
    /// keyless web endpoint)
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic)
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name (ignored by Google)
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Max concurrent requests to this provider
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        let (model, endpoint, rate_limit) = match provider_type {
            TranslationProvider::Google => (String::new(), default_google_endpoint(), Some(300)),
            TranslationProvider::Ollama => (default_ollama_model(), default_ollama_endpoint(), None),
            TranslationProvider::OpenAI => (default_openai_model(), default_openai_endpoint(), Some(60)),
            // Slightly below the documented 50 requests per minute
            TranslationProvider::Anthropic => {
                (default_anthropic_model(), default_anthropic_endpoint(), Some(45))
            }
            TranslationProvider::LMStudio => (default_lmstudio_model(), default_lmstudio_endpoint(), None),
        };

        Self {
            provider_type: provider_type.to_lowercase_string(),
            model,
            api_key: String::new(),
            endpoint,
            concurrent_requests: default_concurrent_requests(),
            rate_limit,
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Providers in fallback order; the first one is tried first
    #[serde(default = "default_provider_chain")]
    pub providers: Vec<TranslationProvider>,

    /// Settings per provider
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// System prompt template for LLM providers
    /// Placeholders: {source_language}, {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Attempts per provider before falling back to the next one
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff between attempts, doubled on each retry (milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Upper bound for a single backoff delay (milliseconds)
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Timeout of a single provider attempt
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Entries translated concurrently
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Temperature parameter for LLM providers (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            timeout_secs: default_timeout_secs(),
            concurrent_requests: default_concurrent_requests(),
            temperature: default_temperature(),
        }
    }
}

/// Which token families are protected during translation
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ShieldConfig {
    /// Protect `{name}`, `%name%`, `%s` and `$VAR` placeholders
    #[serde(default = "default_true")]
    pub protect_placeholders: bool,

    /// Protect colour codes, MiniMessage tags and line breaks
    #[serde(default = "default_true")]
    pub protect_formatting: bool,

    /// Terms kept in their source spelling (whole word, case-insensitive)
    #[serde(default = "default_glossary")]
    pub glossary: Vec<String>,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            protect_placeholders: true,
            protect_formatting: true,
            glossary: default_glossary(),
        }
    }
}

impl ShieldConfig {
    /// Build the token shield described by this configuration
    pub fn build_shield(&self) -> TokenShield {
        TokenShield::standard(self.protect_placeholders, self.protect_formatting, &self.glossary)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_max_backoff_ms() -> u64 {
    8000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}

fn default_provider_chain() -> Vec<TranslationProvider> {
    vec![TranslationProvider::Google]
}

fn default_google_endpoint() -> String {
    "https://translation.googleapis.com/language/translate/v2".to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_lmstudio_endpoint() -> String {
    // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
    "http://localhost:1234/v1".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_lmstudio_model() -> String {
    // Placeholder; users should set to the loaded model name in LM Studio
    "local-model".to_string()
}

fn default_system_prompt() -> String {
    "You translate Minecraft plugin messages from {source_language} to {target_language}. \
     Reply with the translated text only. Copy every marker of the form [#001] exactly as it \
     appears, keep it in a grammatically sensible position, and never translate, renumber or \
     remove it."
        .to_string()
}

/// Protected Minecraft terms used when no glossary is configured
pub fn default_glossary() -> Vec<String> {
    [
        "Land", "Chunk", "Chunks", "Biome", "Biomes", "Nether", "End", "Overworld", "PvP",
        "Cooldown", "Cooldowns", "Claim", "Claims", "Unclaim", "Spawn", "Mob", "Mobs", "XP",
        "Health", "Mana", "Region", "Block", "Blocks", "Item", "Items", "Inventory", "Server",
        "Player", "Players", "World", "Worlds",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect()
}

impl Config {
    /// Load the configuration from `path`, writing a default file first if
    /// it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            return Ok(config);
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {:?}", path))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if !crate::language_utils::is_auto(&self.source_language) {
            crate::language_utils::get_language_name(&self.source_language)?;
        }
        if crate::language_utils::is_auto(&self.target_language) {
            return Err(anyhow!("Target language cannot be 'auto'"));
        }
        crate::language_utils::get_language_name(&self.target_language)?;

        if crate::language_utils::language_codes_match(&self.source_language, &self.target_language) {
            warn!(
                "Source and target language are both '{}'; values will be rewritten in the same language",
                self.target_language
            );
        }

        if self.translation.providers.is_empty() {
            return Err(anyhow!("At least one translation provider must be configured"));
        }

        let common = &self.translation.common;
        if common.retry_count == 0 {
            return Err(anyhow!("retry_count must be at least 1"));
        }
        if common.concurrent_requests == 0 {
            return Err(anyhow!("concurrent_requests must be at least 1"));
        }
        if common.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be at least 1"));
        }

        for settings in &self.translation.available_providers {
            settings
                .provider_type
                .parse::<TranslationProvider>()
                .context("Unknown entry in available_providers")?;
        }

        for provider in &self.translation.providers {
            let settings = self.translation.provider_config(*provider);
            if provider.requires_api_key() && settings.api_key.trim().is_empty() {
                return Err(anyhow!(
                    "Translation API key is required for {} provider",
                    provider.display_name()
                ));
            }
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: "it".to_string(),
            translation: TranslationConfig::default(),
            shield: ShieldConfig::default(),
            intentionally_blank: Vec::new(),
            backup: true,
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Settings for a provider, falling back to its defaults when it has no entry
    pub fn provider_config(&self, provider: TranslationProvider) -> ProviderConfig {
        let id = provider.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type.eq_ignore_ascii_case(&id))
            .cloned()
            .unwrap_or_else(|| ProviderConfig::new(provider))
    }

    /// Providers with their settings, in fallback order
    pub fn provider_chain(&self) -> Vec<(TranslationProvider, ProviderConfig)> {
        self.providers
            .iter()
            .map(|p| (*p, self.provider_config(*p)))
            .collect()
    }

    /// Put `provider` first in the fallback order
    pub fn prefer_provider(&mut self, provider: TranslationProvider) {
        self.providers.retain(|p| *p != provider);
        self.providers.insert(0, provider);
    }

    /// Override the model of a provider, adding an entry for it if needed
    pub fn set_model(&mut self, provider: TranslationProvider, model: &str) {
        let id = provider.to_lowercase_string();
        match self
            .available_providers
            .iter_mut()
            .find(|p| p.provider_type.eq_ignore_ascii_case(&id))
        {
            Some(existing) => existing.model = model.to_string(),
            None => {
                let mut config = ProviderConfig::new(provider);
                config.model = model.to_string();
                self.available_providers.push(config);
            }
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            providers: default_provider_chain(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::Google),
                ProviderConfig::new(TranslationProvider::Ollama),
                ProviderConfig::new(TranslationProvider::OpenAI),
                ProviderConfig::new(TranslationProvider::Anthropic),
                ProviderConfig::new(TranslationProvider::LMStudio),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(providers: Vec<TranslationProvider>) -> Config {
        let mut config = Config::default();
        config.translation.providers = providers;
        config
    }

    #[test]
    fn test_validate_withOllamaOnly_shouldPass() {
        assert!(config_with(vec![TranslationProvider::Ollama]).validate().is_ok());
    }

    #[test]
    fn test_validate_withOpenAIWithoutKey_shouldFail() {
        let err = config_with(vec![TranslationProvider::Google, TranslationProvider::OpenAI])
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn test_validate_withDefaultConfig_shouldPass() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_withAutoTarget_shouldFail() {
        let mut config = config_with(vec![TranslationProvider::Ollama]);
        config.target_language = "auto".into();
        assert!(config.validate().is_err());
        config.target_language = "it".into();
        config.source_language = "auto".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_withUnknownProviderSettings_shouldFail() {
        let mut config = config_with(vec![TranslationProvider::Ollama]);
        config.translation.available_providers[0].provider_type = "deepl".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_providerChain_shouldFollowConfiguredOrder() {
        let mut config = config_with(vec![TranslationProvider::OpenAI, TranslationProvider::Ollama]);
        config.translation.prefer_provider(TranslationProvider::Ollama);
        let chain: Vec<_> = config.translation.provider_chain().into_iter().map(|(p, _)| p).collect();
        assert_eq!(chain, vec![TranslationProvider::Ollama, TranslationProvider::OpenAI]);
    }

    #[test]
    fn test_deserialize_withMinimalJson_shouldApplyDefaults() {
        let json = r#"{"source_language":"en","target_language":"de","translation":{}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.translation.providers, vec![TranslationProvider::Google]);
        assert_eq!(config.translation.common.retry_count, 3);
        assert_eq!(config.translation.common.max_backoff_ms, 8000);
        assert!(config.shield.glossary.contains(&"Nether".to_string()));
        assert!(config.backup);
    }

    #[test]
    fn test_loadOrCreate_withMissingFile_shouldWriteDefault() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.json");
        let config = Config::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.target_language, "it");
        let reloaded = Config::load_or_create(&path).unwrap();
        assert_eq!(reloaded.translation.providers, config.translation.providers);
    }
}
