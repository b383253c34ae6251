/*!
 * Integration tests for the full translation pipeline.
 *
 * Runs realistic plugin language files through repair, translation,
 * post-fix and verification with mock providers.
 */

use anyhow::Result;
use std::collections::BTreeSet;

use mclt::document::{parse, render};
use mclt::pipeline::{EntryFailure, PipelineConfig, RunStatus};
use mclt::providers::mock::MockProvider;
use mclt::shield::TokenKind;

use crate::common;

/// Fifty entries, each carrying one `{amount}` placeholder
fn shop_messages() -> String {
    (1..=50)
        .map(|i| format!("item_{}: \"Entry {} costs {{amount}} coins\"\n", i, i))
        .collect()
}

/// Test that placeholders survive a translation unchanged
#[tokio::test]
async fn test_run_withPlaceholders_shouldKeepThemVerbatim() -> Result<()> {
    common::init_logging();
    let pipeline = common::mock_pipeline(vec![MockProvider::working()]);

    let outcome = pipeline
        .run("greeting: \"Hello %s, you have {count} items!\"\n", None)
        .await?;

    let value = &outcome.document.entry("greeting").unwrap().value;
    assert_eq!(value.matches("%s").count(), 1);
    assert_eq!(value.matches("{count}").count(), 1);
    assert_eq!(outcome.status(), RunStatus::Success);
    assert!(outcome.report.is_passed());
    Ok(())
}

/// Test that the whole sample translates and keeps scalars and comments
#[tokio::test]
async fn test_run_withSample_shouldTranslateTextOnly() -> Result<()> {
    let provider = MockProvider::working();
    let pipeline = common::mock_pipeline(vec![provider.clone()]);

    let outcome = pipeline.run(common::SAMPLE_MESSAGES, None).await?;
    let rendered = render(&outcome.document);

    assert_eq!(outcome.status(), RunStatus::Success);
    assert_eq!(provider.request_count(), 5);
    assert!(rendered.starts_with("# Messages for the spawn plugin\n"));
    assert!(rendered.contains("prefix: '&8[&6SPAWN&8] '\n"));
    assert!(rendered.contains("  teleport: '&aTELEPORTED TO THE Nether IN %seconds% SECONDS.'\n"));
    assert!(rendered.contains("  enabled: true\n  radius: 25\n"));
    Ok(())
}

/// Test that an unterminated quote is repaired and listed in the manifest
#[tokio::test]
async fn test_run_withUnterminatedQuote_shouldRepairAndReport() -> Result<()> {
    let pipeline = common::mock_pipeline(vec![MockProvider::working()]);

    let outcome = pipeline.run("title: \"Welcome\nsubtitle: Have fun\n", None).await?;

    assert!(outcome.was_repaired());
    assert_eq!(render(&outcome.document), "title: \"WELCOME\"\nsubtitle: HAVE FUN\n");

    let manifest = outcome.manifest.render();
    assert!(manifest.contains("## Applied fixes (1)"));
    assert!(manifest.contains("unmatched quote"));
    // Repairs alone do not degrade a run
    assert_eq!(outcome.status(), RunStatus::Success);
    Ok(())
}

/// Test that entries keep their source value when every provider fails
#[tokio::test]
async fn test_run_withAllProvidersFailing_shouldKeepSourceValues() -> Result<()> {
    let pipeline = common::mock_pipeline(vec![
        MockProvider::unauthorized().named("primary"),
        MockProvider::failing().named("backup"),
    ]);
    let raw = "welcome: Welcome to the server\nbye: 'See you soon'\n";

    let outcome = pipeline.run(raw, None).await?;

    assert_eq!(render(&outcome.document), raw);
    assert_eq!(outcome.status(), RunStatus::Degraded);
    assert_eq!(outcome.manifest.translation_failures().count(), 2);

    let first = outcome.manifest.translation_failures().next().unwrap();
    assert_eq!(first.key(), "welcome");
    assert_eq!(first.line(), 1);
    assert!(outcome.manifest.render().contains("## TranslationFailed (2)"));
    Ok(())
}

/// Test that dropped placeholders revert exactly the affected entries
#[tokio::test]
async fn test_run_withTwoDroppedPlaceholders_shouldDegradeAndNameThem() -> Result<()> {
    let provider = MockProvider::custom(|request| {
        if request.text.starts_with("Entry 17 ") || request.text.starts_with("Entry 42 ") {
            Ok(request.text.replace("[#001]", "some"))
        } else {
            Ok(MockProvider::shout(&request.text))
        }
    });
    let pipeline = common::mock_pipeline(vec![provider]);
    let raw = shop_messages();

    let outcome = pipeline.run(&raw, None).await?;

    assert_eq!(outcome.status(), RunStatus::Degraded);
    assert_eq!(outcome.status().exit_code(), 2);
    assert_eq!(outcome.manifest.stats.translated, 48);

    let lost: BTreeSet<&str> = outcome.manifest.token_losses().map(|f| f.key()).collect();
    assert_eq!(lost, BTreeSet::from(["item_17", "item_42"]));
    for failure in outcome.manifest.token_losses() {
        match failure {
            EntryFailure::TokenLoss { loss, .. } => {
                assert_eq!(loss.lost.len(), 1);
                assert_eq!(loss.lost[0].kind, TokenKind::Placeholder);
                assert_eq!(loss.lost[0].canonical, "{amount}");
            }
            other => panic!("unexpected failure {:?}", other),
        }
    }

    // Reverted entries keep their source text, so the document itself is intact
    assert_eq!(outcome.document.entry("item_17").unwrap().value, "Entry 17 costs {amount} coins");
    assert_eq!(outcome.document.entry("item_18").unwrap().value, "ENTRY 18 COSTS {amount} COINS");
    assert!(outcome.report.is_passed());
    Ok(())
}

/// Test that a translation identical to the source gives identical bytes
#[tokio::test]
async fn test_run_withIdentityProvider_shouldReproduceInput() -> Result<()> {
    let pipeline = common::mock_pipeline(vec![MockProvider::custom(|request| Ok(request.text.clone()))]);

    let outcome = pipeline.run(common::SAMPLE_MESSAGES, None).await?;

    assert_eq!(render(&outcome.document), common::SAMPLE_MESSAGES);
    assert_eq!(outcome.status(), RunStatus::Success);
    Ok(())
}

/// Test that output parses cleanly with the same keys and entry count
#[tokio::test]
async fn test_run_withRepairedInput_shouldGiveStableOutput() -> Result<()> {
    let pipeline = common::mock_pipeline(vec![MockProvider::working()]);
    let raw = "menu:\n\ttitle:&6Shop\n  lore: \"Click to buy\nfooter: It's {price} coins\n";

    let outcome = pipeline.run(raw, None).await?;
    let reparsed = parse(&render(&outcome.document))?;

    assert!(!reparsed.was_repaired());
    assert_eq!(reparsed.document.len(), outcome.source.len());
    assert_eq!(
        reparsed.document.keys().collect::<Vec<_>>(),
        outcome.source.keys().collect::<Vec<_>>()
    );
    assert_eq!(reparsed.document.entry("footer").unwrap().value, "IT'S {price} COINS");
    Ok(())
}

/// Test that keys listed as intentionally blank may come back empty
#[tokio::test]
async fn test_run_withIntentionallyBlankKey_shouldAcceptEmptyTranslation() -> Result<()> {
    let provider = MockProvider::custom(|request| {
        if request.text == "Optional footer" {
            Ok(" ".to_string())
        } else {
            Ok(MockProvider::shout(&request.text))
        }
    });
    let config = PipelineConfig::new("en", "it").with_intentionally_blank(&["footer"]);
    let pipeline = common::mock_pipeline_with(config, vec![provider]);

    let outcome = pipeline.run("title: Shop\nfooter: Optional footer\n", None).await?;

    assert!(outcome.report.is_passed());
    assert_eq!(outcome.status(), RunStatus::Success);
    Ok(())
}

/// Test that entries in flight never exceed the pipeline or provider bound
#[tokio::test]
async fn test_run_withSlowProvider_shouldBoundEntriesInFlight() -> Result<()> {
    let raw: String = (1..=12).map(|i| format!("line_{}: Message number {}\n", i, i)).collect();

    // Pipeline bound below the provider's limit of 4
    let provider = MockProvider::slow(15);
    let pipeline = common::mock_pipeline_with(PipelineConfig::new("en", "it").with_concurrency(3), vec![provider.clone()]);
    let outcome = pipeline.run(&raw, None).await?;
    assert_eq!(outcome.manifest.stats.translated, 12);
    assert_eq!(provider.peak_in_flight(), 3);

    // Provider limit below the pipeline bound
    let provider = MockProvider::slow(15);
    let pipeline = common::mock_pipeline_with(PipelineConfig::new("en", "it").with_concurrency(8), vec![provider.clone()]);
    let outcome = pipeline.run(&raw, None).await?;
    assert_eq!(outcome.manifest.stats.translated, 12);
    assert_eq!(provider.peak_in_flight(), 4);
    Ok(())
}
