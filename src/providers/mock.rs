/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Upper-cases the text, markers untouched
 * - `MockProvider::flaky(n)` - Fails the first `n` requests, then works
 * - `MockProvider::failing()` - Always fails with a server error
 * - `MockProvider::dropping_tokens()` - Loses every marker
 * - `MockProvider::slow(ms)` - Answers after a delay
 * - `MockProvider::custom(f)` - Answers with a closure
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{Provider, TranslationRequest};
use crate::shield::masking::MARKER_REGEX;

/// Closure answering a request for `MockBehavior::Custom`
pub type MockResponder = Arc<dyn Fn(&TranslationRequest) -> Result<String, ProviderError> + Send + Sync>;

/// Behavior mode for the mock provider
#[derive(Clone)]
pub enum MockBehavior {
    /// Always succeeds with an upper-cased translation
    Working,
    /// Fails the first `failures` requests with a retryable error
    Flaky { failures: usize },
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with a server error
    Failing,
    /// Always fails with an authentication error
    Unauthorized,
    /// Succeeds but removes every marker
    DropTokens,
    /// Returns an empty response
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
    /// Delegates to a closure
    Custom(MockResponder),
}

impl fmt::Debug for MockBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Working => write!(f, "Working"),
            Self::Flaky { failures } => write!(f, "Flaky({})", failures),
            Self::Intermittent { fail_every } => write!(f, "Intermittent({})", fail_every),
            Self::Failing => write!(f, "Failing"),
            Self::Unauthorized => write!(f, "Unauthorized"),
            Self::DropTokens => write!(f, "DropTokens"),
            Self::Empty => write!(f, "Empty"),
            Self::Slow { delay_ms } => write!(f, "Slow({}ms)", delay_ms),
            Self::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    name: String,
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Texts received, in arrival order
    received: Arc<Mutex<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    /// Highest number of simultaneous requests seen
    peak_in_flight: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            name: "mock".to_string(),
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            received: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn flaky(failures: usize) -> Self {
        Self::new(MockBehavior::Flaky { failures })
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn unauthorized() -> Self {
        Self::new(MockBehavior::Unauthorized)
    }

    pub fn dropping_tokens() -> Self {
        Self::new(MockBehavior::DropTokens)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    pub fn custom<F>(responder: F) -> Self
    where
        F: Fn(&TranslationRequest) -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        Self::new(MockBehavior::Custom(Arc::new(responder)))
    }

    /// Rename the provider, useful when several mocks form a fallback chain
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Texts received so far
    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    /// Most requests that were being answered at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// The translation `Working` produces: letters upper-cased, markers kept
    pub fn shout(text: &str) -> String {
        text.to_uppercase()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.received.lock().push(request.text.clone());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);
        self.respond(count, request).await
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("Simulated outage".to_string())),
            MockBehavior::Unauthorized => Err(ProviderError::AuthenticationError("Invalid API key".to_string())),
            _ => Ok(()),
        }
    }
}

// @struct: Leaves the in-flight count on drop, also when a timeout cancels the call
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockProvider {
    async fn respond(&self, count: usize, request: &TranslationRequest) -> Result<String, ProviderError> {
        match &self.behavior {
            MockBehavior::Working => Ok(Self::shout(&request.text)),

            MockBehavior::Flaky { failures } => {
                if count < *failures {
                    Err(ProviderError::ConnectionError(format!(
                        "Simulated connection reset (request #{})",
                        count + 1
                    )))
                } else {
                    Ok(Self::shout(&request.text))
                }
            }

            MockBehavior::Intermittent { fail_every } => {
                if *fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(Self::shout(&request.text))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Unauthorized => Err(ProviderError::AuthenticationError("Invalid API key".to_string())),

            MockBehavior::DropTokens => {
                let stripped = MARKER_REGEX.replace_all(&request.text, "");
                Ok(Self::shout(stripped.trim()))
            }

            MockBehavior::Empty => Err(ProviderError::EmptyResponse),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(*delay_ms)).await;
                Ok(Self::shout(&request.text))
            }

            MockBehavior::Custom(responder) => responder(request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str) -> TranslationRequest {
        TranslationRequest::new(text, "en", "it")
    }

    #[tokio::test]
    async fn test_workingProvider_shouldKeepMarkers() {
        let provider = MockProvider::working();
        let text = provider.translate(&request("Hello [#001], bye")).await.unwrap();
        assert_eq!(text, "HELLO [#001], BYE");
        assert_eq!(provider.received(), vec!["Hello [#001], bye".to_string()]);
    }

    #[tokio::test]
    async fn test_flakyProvider_shouldRecoverAfterFailures() {
        let provider = MockProvider::flaky(2);
        assert!(provider.translate(&request("a")).await.is_err());
        assert!(provider.translate(&request("a")).await.is_err());
        assert!(provider.translate(&request("a")).await.is_ok());
        assert_eq!(provider.request_count(), 3);
    }

    #[tokio::test]
    async fn test_intermittentProvider_shouldFailPeriodically() {
        let provider = MockProvider::intermittent(3);
        assert!(provider.translate(&request("a")).await.is_ok());
        assert!(provider.translate(&request("a")).await.is_ok());
        assert!(provider.translate(&request("a")).await.is_err());
        assert!(provider.translate(&request("a")).await.is_ok());
    }

    #[tokio::test]
    async fn test_droppingProvider_shouldRemoveMarkers() {
        let provider = MockProvider::dropping_tokens();
        let text = provider.translate(&request("[#001]Hi [#002]")).await.unwrap();
        assert_eq!(text, "HI");
    }

    #[tokio::test]
    async fn test_clonedProvider_shouldShareRequestCount() {
        let provider = MockProvider::intermittent(2);
        let cloned = provider.clone();
        assert!(provider.translate(&request("a")).await.is_ok());
        assert!(cloned.translate(&request("a")).await.is_err());
    }

    #[tokio::test]
    async fn test_customProvider_shouldUseClosure() {
        let provider = MockProvider::custom(|req| Ok(format!("{}>{}", req.source_language, req.target_language)))
            .named("scripted");
        assert_eq!(provider.translate(&request("x")).await.unwrap(), "en>it");
        assert_eq!(provider.name(), "scripted");
    }
}
