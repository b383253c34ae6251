/*!
 * Tests for document parsing, repair and re-emission
 */

use anyhow::Result;
use mclt::document::{FixKind, ValueKind, parse, render, write_document};
use mclt::errors::ParseError;
use mclt::shield::TokenShield;

use crate::common;

/// Test that a clean file is re-emitted byte for byte
#[test]
fn test_render_withCleanSample_shouldRoundTripBytes() -> Result<()> {
    let parsed = parse(common::SAMPLE_MESSAGES)?;

    assert!(parsed.fixes.is_empty());
    assert!(parsed.review.is_empty());
    assert_eq!(render(&parsed.document), common::SAMPLE_MESSAGES);
    Ok(())
}

/// Test that nested sections produce dotted keys and scalars are kept out of translation
#[test]
fn test_parse_withSample_shouldClassifyEntries() -> Result<()> {
    let document = parse(common::SAMPLE_MESSAGES)?.document;

    assert_eq!(document.len(), 7);
    assert_eq!(document.entry("messages.reload").unwrap().value, "Configuration reloaded");
    assert_eq!(document.entry("settings.enabled").unwrap().kind, ValueKind::NonString);
    assert_eq!(document.entry("settings.radius").unwrap().kind, ValueKind::NonString);
    assert_eq!(document.entries.iter().filter(|e| e.is_translatable()).count(), 5);
    Ok(())
}

/// Test that changing one value only rewrites that line
#[test]
fn test_setValue_withOneEntry_shouldLeaveOtherLinesUntouched() -> Result<()> {
    let mut document = parse(common::SAMPLE_MESSAGES)?.document;
    document
        .entry_mut("messages.reload")
        .unwrap()
        .set_value("Configurazione ricaricata");

    let rendered = render(&document);
    assert!(rendered.contains("  reload: Configurazione ricaricata\n"));
    assert_eq!(
        rendered.replace("Configurazione ricaricata", "Configuration reloaded"),
        common::SAMPLE_MESSAGES
    );
    Ok(())
}

/// Test that an apostrophe in a single-quoted value is re-escaped
#[test]
fn test_setValue_withApostropheInSingleQuotes_shouldDoubleIt() -> Result<()> {
    let mut document = parse("msg: 'Hello'\n")?.document;
    document.entry_mut("msg").unwrap().set_value("C'est parti");

    assert_eq!(render(&document), "msg: 'C''est parti'\n");
    Ok(())
}

/// Test that an unterminated quote is closed and recorded
#[test]
fn test_parse_withUnterminatedQuote_shouldRepairAndRecord() -> Result<()> {
    let parsed = parse("title: \"Welcome\nsubtitle: 'Enjoy'\n")?;

    assert_eq!(parsed.fixes.len(), 1);
    assert_eq!(parsed.fixes[0].kind, FixKind::UnmatchedQuote);
    assert_eq!(parsed.fixes[0].line, 1);
    assert_eq!(parsed.document.entry("title").unwrap().value, "Welcome");
    assert_eq!(render(&parsed.document), "title: \"Welcome\"\nsubtitle: 'Enjoy'\n");
    Ok(())
}

/// Test that repairing an already repaired file changes nothing
#[test]
fn test_parse_withRepairedOutput_shouldBeStable() -> Result<()> {
    let first = parse("a:value\nb: \"open\nroot:\n\tkey: &cRed\n")?;
    assert!(first.was_repaired());

    let second = parse(&render(&first.document))?;
    assert!(!second.was_repaired());
    assert_eq!(render(&second.document), render(&first.document));
    Ok(())
}

/// Test that a byte order mark and CRLF line endings survive
#[test]
fn test_render_withBomAndCrlf_shouldPreserveBoth() -> Result<()> {
    let raw = "\u{feff}a: Hello\r\nb: World\r\n";
    let parsed = parse(raw)?;

    assert_eq!(parsed.document.entry("a").unwrap().value, "Hello");
    assert_eq!(render(&parsed.document), raw);
    Ok(())
}

/// Test that duplicate keys are fatal
#[test]
fn test_parse_withDuplicateNestedKey_shouldFail() {
    let result = parse("menu:\n  title: A\n  title: B\n");
    assert!(matches!(result, Err(ParseError::DuplicateKey { ref key, .. }) if key == "menu.title"));
}

/// Test that the fingerprint counts entries and tokens
#[test]
fn test_fingerprint_withSample_shouldCountTokens() -> Result<()> {
    let shield = TokenShield::standard(true, true, &["Nether"]);
    let fingerprint = parse(common::SAMPLE_MESSAGES)?.document.fingerprint(&shield);

    assert_eq!(fingerprint.entry_count, 7);
    assert_eq!(fingerprint.keys[1], "greeting");
    // prefix: 3 codes, greeting: 2, teleport: 3, cooldown: 1
    assert_eq!(fingerprint.token_count(), 9);
    Ok(())
}

/// Test that a document is written to disk as rendered
#[test]
fn test_writeDocument_shouldWriteRenderedText() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("out").join("messages_it.yml");
    let document = parse(common::SAMPLE_MESSAGES)?.document;

    write_document(&document, &path)?;
    assert_eq!(std::fs::read_to_string(&path)?, common::SAMPLE_MESSAGES);
    Ok(())
}
