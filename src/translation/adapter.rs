/*!
 * Translation adapter: one masked value in, one outcome out.
 *
 * Providers are tried in their configured order. Each provider gets up to
 * `retry_count` attempts with exponential backoff; an error that cannot
 * succeed on retry (bad credentials, client errors) moves on to the next
 * provider at once. Every attempt goes through the provider's throttle and
 * is bounded by the per-attempt timeout.
 */

use anyhow::{Context, Result};
use log::{debug, warn};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use super::throttle::{ProviderThrottle, RequestCounter};
use crate::app_config::{TranslationCommonConfig, TranslationConfig};
use crate::errors::{ProviderError, TranslationError};
use crate::providers::{Provider, TranslationRequest, build_provider};

/// Retry and timeout settings applied to every provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per provider
    pub attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_common(common: &TranslationCommonConfig) -> Self {
        Self {
            attempts: common.retry_count.max(1),
            base_backoff: Duration::from_millis(common.retry_backoff_ms),
            max_backoff: Duration::from_millis(common.max_backoff_ms),
            attempt_timeout: Duration::from_secs(common.timeout_secs),
        }
    }

    /// Delay after failed attempt `attempt` (1-based): base * 2^(attempt-1), capped
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_backoff.saturating_mul(factor).min(self.max_backoff)
    }

    /// Backoff with up to 10% random jitter added
    fn jittered_backoff(&self, attempt: u32) -> Duration {
        let delay = self.backoff(attempt);
        let jitter_ms = (delay.as_millis() / 10) as u64;
        if jitter_ms == 0 {
            return delay;
        }
        delay + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_common(&TranslationCommonConfig::default())
    }
}

/// Result of translating one value
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterOutcome {
    Translated {
        text: String,
        /// Name of the provider that answered
        provider: String,
        /// Attempts used over all providers, the successful one included
        attempts: u32,
    },
    Failed {
        attempts: u32,
        /// Every error observed, with the provider that raised it
        errors: Vec<(String, ProviderError)>,
    },
}

impl AdapterOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Translated { attempts, .. } | Self::Failed { attempts, .. } => *attempts,
        }
    }

    /// Convert to a result; `providers` is the chain length for the error message
    pub fn into_result(self, providers: usize) -> Result<String, TranslationError> {
        match self {
            Self::Translated { text, .. } => Ok(text),
            Self::Failed { attempts, errors } => Err(TranslationError::Exhausted {
                providers,
                attempts,
                last_error: errors
                    .last()
                    .map(|(name, e)| format!("{}: {}", name, e))
                    .unwrap_or_else(|| "no provider configured".to_string()),
            }),
        }
    }
}

// @struct: Provider with its throttle
#[derive(Debug)]
struct ProviderSlot {
    provider: Arc<dyn Provider>,
    throttle: ProviderThrottle,
}

/// Fallback chain of providers with retry, backoff and throttling
#[derive(Debug)]
pub struct TranslationAdapter {
    chain: Vec<ProviderSlot>,
    policy: RetryPolicy,
    counter: Arc<RequestCounter>,
}

impl TranslationAdapter {
    /// Create an adapter with an empty chain
    pub fn new(policy: RetryPolicy, counter: Arc<RequestCounter>) -> Self {
        Self {
            chain: Vec::new(),
            policy,
            counter,
        }
    }

    /// Append a provider to the fallback chain
    pub fn with_provider(
        mut self,
        provider: Arc<dyn Provider>,
        max_concurrent: usize,
        requests_per_minute: Option<u32>,
    ) -> Self {
        let throttle = ProviderThrottle::new(max_concurrent, requests_per_minute, self.counter.clone());
        self.chain.push(ProviderSlot { provider, throttle });
        self
    }

    /// Build the chain described by the translation configuration
    pub fn from_config(config: &TranslationConfig, counter: Arc<RequestCounter>) -> Result<Self> {
        let mut adapter = Self::new(RetryPolicy::from_common(&config.common), counter);
        for (kind, settings) in config.provider_chain() {
            let provider = build_provider(kind, &settings, &config.common)
                .with_context(|| format!("Failed to set up provider {}", kind.display_name()))?;
            adapter = adapter.with_provider(provider, settings.concurrent_requests, settings.rate_limit);
        }
        Ok(adapter)
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn counter(&self) -> &Arc<RequestCounter> {
        &self.counter
    }

    pub fn provider_count(&self) -> usize {
        self.chain.len()
    }

    /// Names of the providers in fallback order
    pub fn provider_names(&self) -> Vec<String> {
        self.chain.iter().map(|s| s.provider.name().to_string()).collect()
    }

    /// Providers in fallback order
    pub fn providers(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.chain.iter().map(|s| &s.provider)
    }

    async fn attempt(&self, slot: &ProviderSlot, request: &TranslationRequest) -> Result<String, ProviderError> {
        let _permit = slot
            .throttle
            .acquire()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("Throttle closed: {}", e)))?;

        match tokio::time::timeout(self.policy.attempt_timeout, slot.provider.translate(request)).await {
            Ok(Err(ProviderError::Timeout(_))) | Err(_) => {
                Err(ProviderError::Timeout(self.policy.attempt_timeout.as_millis() as u64))
            }
            Ok(result) => result,
        }
    }

    /// Translate one masked value through the fallback chain
    pub async fn translate(&self, masked: &str, source_language: &str, target_language: &str) -> AdapterOutcome {
        let request = TranslationRequest::new(masked, source_language, target_language);
        let mut attempts = 0u32;
        let mut errors = Vec::new();

        for slot in &self.chain {
            let name = slot.provider.name();

            for attempt in 1..=self.policy.attempts {
                attempts += 1;
                match self.attempt(slot, &request).await {
                    Ok(text) => {
                        debug!("{} translated value on attempt {}", name, attempt);
                        return AdapterOutcome::Translated {
                            text,
                            provider: name.to_string(),
                            attempts,
                        };
                    }
                    Err(error) => {
                        self.counter.record_failure();
                        let retryable = error.is_retryable();
                        warn!(
                            "{} attempt {}/{} failed: {}",
                            name, attempt, self.policy.attempts, error
                        );
                        errors.push((name.to_string(), error));

                        if !retryable {
                            break;
                        }
                        if attempt < self.policy.attempts {
                            tokio::time::sleep(self.policy.jittered_backoff(attempt)).await;
                        }
                    }
                }
            }
        }

        AdapterOutcome::Failed { attempts, errors }
    }
}
