/*!
 * Tests for token shielding
 */

use mclt::shield::{TokenKind, TokenShield};

fn shield() -> TokenShield {
    TokenShield::standard(true, true, &["Nether", "Chunk"])
}

/// Test that every supported syntax is detected with the right kind
#[test]
fn test_detect_withMixedSyntaxes_shouldClassifyTokens() {
    let tokens = shield().detect("&aHi {player}, %balance% coins in the Nether <bold>now</bold> %1$s");

    let found: Vec<(TokenKind, &str)> = tokens.iter().map(|t| t.identity()).collect();
    assert_eq!(
        found,
        vec![
            (TokenKind::FormattingCode, "&a"),
            (TokenKind::Placeholder, "{player}"),
            (TokenKind::Placeholder, "%balance%"),
            (TokenKind::GlossaryTerm, "Nether"),
            (TokenKind::FormattingCode, "<bold>"),
            (TokenKind::FormattingCode, "</bold>"),
            (TokenKind::Placeholder, "%1$s"),
        ]
    );
}

/// Test that overlapping candidates resolve to the longest span
#[test]
fn test_detect_withHexColour_shouldPreferLongestSpan() {
    let tokens = shield().detect("&x&f&f&0&0&0&0Gold");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].canonical, "&x&f&f&0&0&0&0");
}

/// Test that masking then unmasking an untouched value restores it exactly
#[test]
fn test_unmask_withUntouchedMarkers_shouldRestoreSource() {
    let shield = shield();
    let source = "&cYou need {amount} more Chunk claims&r!";

    let shielded = shield.mask(source);
    assert!(!shielded.masked.contains('{'));
    assert!(!shielded.masked.contains('&'));

    let restored = shield.unmask(&shielded.masked, &shielded.tokens).unwrap();
    assert_eq!(restored, source);
}

/// Test that reordered and loosely spaced markers are still restored
#[test]
fn test_unmask_withReorderedMarkers_shouldRestoreEachToken() {
    let shield = shield();
    let shielded = shield.mask("{player} killed {target}");
    assert_eq!(shielded.masked, "[#001] killed [#002]");

    let restored = shield.unmask("[ #002 ] fue asesinado por [#1]", &shielded.tokens).unwrap();
    assert_eq!(restored, "{target} fue asesinado por {player}");
}

/// Test that a dropped marker is reported with its token
#[test]
fn test_unmask_withDroppedMarker_shouldReportLoss() {
    let shield = shield();
    let shielded = shield.mask("Hello %s, you have {count} items!");

    let loss = shield.unmask("Ciao [#001], hai degli oggetti!", &shielded.tokens).unwrap_err();
    assert_eq!(loss.lost.len(), 1);
    assert_eq!(loss.lost[0].kind, TokenKind::Placeholder);
    assert_eq!(loss.lost[0].canonical, "{count}");
    assert_eq!(loss.lost[0].marker, "[#002]");
}

/// Test that a value made only of codes is recognized as token-only
#[test]
fn test_mask_withOnlyCodes_shouldBeTokenOnly() {
    let shield = shield();
    assert!(shield.mask("&8&m").is_only_markers());
    assert!(shield.mask("{prefix} <gray>").is_only_markers());
    assert!(!shield.mask("&aReady").is_only_markers());
}

/// Test that disabled categories are left as plain text
#[test]
fn test_standard_withPlaceholdersDisabled_shouldOnlyShieldCodes() {
    let shield = TokenShield::standard(false, true, &[] as &[&str]);
    let tokens = shield.detect("&a{player}");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::FormattingCode);
}
