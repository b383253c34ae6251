/*!
 * Tests for the provider fallback chain
 */

use std::sync::Arc;
use std::time::{Duration, Instant};

use mclt::errors::{ProviderError, TranslationError};
use mclt::providers::mock::MockProvider;
use mclt::translation::{AdapterOutcome, RequestCounter, TranslationAdapter};

use crate::common;

fn adapter(providers: &[&MockProvider]) -> TranslationAdapter {
    providers
        .iter()
        .fold(TranslationAdapter::new(common::fast_policy(), RequestCounter::new()), |adapter, provider| {
            adapter.with_provider(Arc::new((*provider).clone()), 2, None)
        })
}

/// Test that the chain is walked in order until a provider answers
#[tokio::test]
async fn test_translate_withTwoFailingProviders_shouldReachThird() {
    let first = MockProvider::failing().named("first");
    let second = MockProvider::empty().named("second");
    let third = MockProvider::working().named("third");
    let adapter = adapter(&[&first, &second, &third]);

    assert_eq!(adapter.provider_names(), vec!["first", "second", "third"]);

    let outcome = adapter.translate("Welcome [#001]", "en", "de").await;
    match outcome {
        AdapterOutcome::Translated { text, provider, attempts } => {
            assert_eq!(text, "WELCOME [#001]");
            assert_eq!(provider, "third");
            assert_eq!(attempts, 5);
        }
        other => panic!("expected a translation, got {:?}", other),
    }
    assert_eq!(first.request_count(), 2);
    assert_eq!(second.request_count(), 2);
    assert_eq!(third.received(), vec!["Welcome [#001]".to_string()]);
}

/// Test that an exhausted chain keeps every error and reports the last one
#[tokio::test]
async fn test_translate_withAllFailing_shouldCollectErrors() {
    let first = MockProvider::unauthorized().named("first");
    let second = MockProvider::failing().named("second");
    let adapter = adapter(&[&first, &second]);

    let outcome = adapter.translate("Hi", "en", "fr").await;
    let AdapterOutcome::Failed { attempts, errors } = outcome.clone() else {
        panic!("expected failure, got {:?}", outcome);
    };
    assert_eq!(attempts, 3);
    assert!(matches!(errors[0], (ref name, ProviderError::AuthenticationError(_)) if name == "first"));
    assert_eq!(errors.len(), 3);

    let error = outcome.into_result(adapter.provider_count()).unwrap_err();
    assert!(matches!(error, TranslationError::Exhausted { providers: 2, attempts: 3, .. }));
    assert!(error.to_string().contains("second"));
    assert_eq!(adapter.counter().failed(), 3);
}

/// Test that a custom responder receives the masked text and languages
#[tokio::test]
async fn test_translate_withCustomProvider_shouldReceiveRequest() {
    let provider = MockProvider::custom(|request| {
        Ok(format!("{}>{}: {}", request.source_language, request.target_language, request.text))
    });
    let adapter = adapter(&[&provider]);

    let outcome = adapter.translate("[#001] Hola", "es", "en").await;
    assert_eq!(outcome.into_result(1).unwrap(), "es>en: [#001] Hola");
}

/// Test that a rate limit spaces request starts
#[tokio::test]
async fn test_translate_withRateLimit_shouldSpaceRequests() {
    let adapter = TranslationAdapter::new(common::fast_policy(), RequestCounter::new()).with_provider(
        Arc::new(MockProvider::working()),
        4,
        Some(1200),
    );

    let start = Instant::now();
    for _ in 0..3 {
        adapter.translate("Hi", "en", "it").await;
    }

    // 1200 requests per minute is one start every 50 ms
    assert!(start.elapsed() >= Duration::from_millis(100));
    assert_eq!(adapter.counter().started(), 3);
}

/// Test that a provider never serves more requests at once than its limit
#[tokio::test]
async fn test_translate_withConcurrentCalls_shouldRespectProviderLimit() {
    let provider = MockProvider::slow(20);
    let adapter = adapter(&[&provider]);

    let calls = (0..6).map(|i| {
        let text = format!("Line {}", i);
        let adapter = &adapter;
        async move { adapter.translate(&text, "en", "it").await }
    });
    let outcomes = futures::future::join_all(calls).await;

    assert!(outcomes.iter().all(|o| matches!(o, AdapterOutcome::Translated { .. })));
    assert_eq!(provider.request_count(), 6);
    assert_eq!(provider.peak_in_flight(), 2);
}
