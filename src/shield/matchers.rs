/*!
 * Span matchers for protected substrings.
 *
 * Each matcher is independent and only reports candidate spans. Conflicts
 * between matchers are resolved afterwards by `merge_spans`, a pure
 * function: longer spans win, and on equal length the matcher listed
 * earlier wins.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use super::TokenKind;

/// Placeholder syntaxes found in plugin and mod language files
static PLACEHOLDER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // {count}, {0}, {player_name}
        r"\{[^{}\s][^{}]*\}",
        // PlaceholderAPI style %player_name%
        r"%[^%\s]+%",
        // printf style %s, %d, %1$s, %.2f
        r"%(?:\d+\$)?[-+0#]?\d*(?:\.\d+)?[sdifxXoeEgGc]",
        // $VARIABLE
        r"\$[A-Za-z0-9_]+",
        // Anything shaped like a shield marker must itself be shielded,
        // otherwise unmasking would rewrite it
        r"\[\s*#\s*\d+\s*\]",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid placeholder regex"))
    .collect()
});

/// Colour and style code syntaxes
static FORMATTING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Spigot hex &x&f&f&0&0&0&0 / §x§f§f§0§0§0§0
        r"[&§][xX](?:[&§][0-9a-fA-F]){6}",
        // &#ff0000
        r"[&§]#[0-9a-fA-F]{6}",
        // Legacy &a, §l, &r
        r"[&§][0-9a-fk-orA-FK-OR]",
        // MiniMessage tags <red>, </bold>, <#ff00ff>, <gradient:red:blue>
        r"</?[#A-Za-z_!][^<>\s]*>",
        // Line breaks, both real and written as a literal backslash-n
        r"\r?\n|\\n",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid formatting regex"))
    .collect()
});

/// A candidate span reported by a matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Byte offset of the span start
    pub start: usize,
    /// Byte offset one past the span end
    pub end: usize,
    /// Kind of token the span represents
    pub kind: TokenKind,
}

impl Span {
    /// Span length in bytes
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span is empty
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether two spans share at least one byte
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// An independent detector of protected spans
pub trait TokenMatcher: Send + Sync {
    /// Kind of token this matcher reports
    fn kind(&self) -> TokenKind;

    /// Every candidate span in `text`; spans may overlap
    fn find_spans(&self, text: &str) -> Vec<Span>;
}

fn spans_for(patterns: &[Regex], text: &str, kind: TokenKind) -> Vec<Span> {
    patterns
        .iter()
        .flat_map(|re| re.find_iter(text))
        .map(|m| Span {
            start: m.start(),
            end: m.end(),
            kind,
        })
        .collect()
}

/// Detects runtime substitution placeholders
#[derive(Debug, Default)]
pub struct PlaceholderMatcher;

impl TokenMatcher for PlaceholderMatcher {
    fn kind(&self) -> TokenKind {
        TokenKind::Placeholder
    }

    fn find_spans(&self, text: &str) -> Vec<Span> {
        spans_for(&PLACEHOLDER_PATTERNS, text, self.kind())
    }
}

/// Detects colour codes, style tags and line breaks
#[derive(Debug, Default)]
pub struct FormattingCodeMatcher;

impl TokenMatcher for FormattingCodeMatcher {
    fn kind(&self) -> TokenKind {
        TokenKind::FormattingCode
    }

    fn find_spans(&self, text: &str) -> Vec<Span> {
        spans_for(&FORMATTING_PATTERNS, text, self.kind())
    }
}

/// Detects configured glossary terms as whole words, ignoring case
#[derive(Debug)]
pub struct GlossaryMatcher {
    pattern: Option<Regex>,
}

impl GlossaryMatcher {
    /// Build a matcher from a list of terms.
    ///
    /// Terms are tried longest first so `Chunks` is preferred over `Chunk`.
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Self {
        let mut terms: Vec<&str> = terms
            .iter()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .collect();
        terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        terms.dedup();

        if terms.is_empty() {
            return Self { pattern: None };
        }

        let alternation = terms
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        // Escaped literals always form a valid pattern
        let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).ok();

        Self { pattern }
    }

    /// Whether any term is configured
    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
    }
}

impl TokenMatcher for GlossaryMatcher {
    fn kind(&self) -> TokenKind {
        TokenKind::GlossaryTerm
    }

    fn find_spans(&self, text: &str) -> Vec<Span> {
        match &self.pattern {
            Some(re) => re
                .find_iter(text)
                .map(|m| Span {
                    start: m.start(),
                    end: m.end(),
                    kind: self.kind(),
                })
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Merge candidate spans from several matchers into a non-overlapping set.
///
/// `groups[i]` holds the spans of the i-th matcher in detection order.
/// Longest spans are accepted first; ties go to the earlier matcher, then to
/// the earlier position. The result is sorted by start offset.
pub fn merge_spans(groups: &[Vec<Span>]) -> Vec<Span> {
    let mut candidates: Vec<(usize, Span)> = groups
        .iter()
        .enumerate()
        .flat_map(|(priority, spans)| spans.iter().map(move |s| (priority, *s)))
        .filter(|(_, s)| !s.is_empty())
        .collect();

    candidates.sort_by(|(pa, a), (pb, b)| {
        b.len()
            .cmp(&a.len())
            .then_with(|| pa.cmp(pb))
            .then_with(|| a.start.cmp(&b.start))
    });

    let mut accepted: Vec<Span> = Vec::with_capacity(candidates.len());
    for (_, span) in candidates {
        if !accepted.iter().any(|a| a.overlaps(&span)) {
            accepted.push(span);
        }
    }

    accepted.sort_by_key(|s| s.start);
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(text: &'a str, spans: &[Span]) -> Vec<&'a str> {
        spans.iter().map(|s| &text[s.start..s.end]).collect()
    }

    #[test]
    fn test_placeholderMatcher_shouldFindCommonSyntaxes() {
        let text = "Hello %s, {count} items for %player_name% and $NAME";
        let spans = merge_spans(&[PlaceholderMatcher.find_spans(text)]);
        assert_eq!(texts(text, &spans), vec!["%s", "{count}", "%player_name%", "$NAME"]);
    }

    #[test]
    fn test_placeholderMatcher_withPercentInProse_shouldNotMatch() {
        let text = "Save 50% on everything";
        assert!(PlaceholderMatcher.find_spans(text).is_empty());
    }

    #[test]
    fn test_formattingMatcher_shouldFindLegacyHexAndTags() {
        let text = "&aGreen §lBold &#ff00aaHex <red>Red</red>";
        let spans = merge_spans(&[FormattingCodeMatcher.find_spans(text)]);
        assert_eq!(
            texts(text, &spans),
            vec!["&a", "§l", "&#ff00aa", "<red>", "</red>"]
        );
    }

    #[test]
    fn test_formattingMatcher_withSpigotHex_shouldPreferWholeSequence() {
        let text = "&x&f&f&0&0&0&0Red";
        let spans = merge_spans(&[FormattingCodeMatcher.find_spans(text)]);
        assert_eq!(texts(text, &spans), vec!["&x&f&f&0&0&0&0"]);
    }

    #[test]
    fn test_glossaryMatcher_shouldMatchWholeWordsIgnoringCase() {
        let matcher = GlossaryMatcher::new(&["Chunk", "Chunks", "Nether"]);
        let text = "Claim chunks in the NETHER, not Chunkless areas";
        let spans = merge_spans(&[matcher.find_spans(text)]);
        assert_eq!(texts(text, &spans), vec!["chunks", "NETHER"]);
    }

    #[test]
    fn test_glossaryMatcher_withNoTerms_shouldBeEmpty() {
        let matcher = GlossaryMatcher::new::<&str>(&[]);
        assert!(matcher.is_empty());
        assert!(matcher.find_spans("anything").is_empty());
    }

    #[test]
    fn test_mergeSpans_withOverlap_shouldKeepLongest() {
        let short = Span { start: 1, end: 7, kind: TokenKind::GlossaryTerm };
        let long = Span { start: 0, end: 8, kind: TokenKind::Placeholder };
        let merged = merge_spans(&[vec![short], vec![long]]);
        assert_eq!(merged, vec![long]);
    }

    #[test]
    fn test_mergeSpans_withEqualLength_shouldPreferEarlierMatcher() {
        let first = Span { start: 0, end: 4, kind: TokenKind::Placeholder };
        let second = Span { start: 0, end: 4, kind: TokenKind::GlossaryTerm };
        let merged = merge_spans(&[vec![first], vec![second]]);
        assert_eq!(merged, vec![first]);
    }

    #[test]
    fn test_mergeSpans_shouldReturnSortedDisjointSpans() {
        let a = Span { start: 10, end: 12, kind: TokenKind::FormattingCode };
        let b = Span { start: 0, end: 3, kind: TokenKind::Placeholder };
        let merged = merge_spans(&[vec![a, b]]);
        assert_eq!(merged, vec![b, a]);
    }

    #[test]
    fn test_placeholderInsideBraces_shouldBeatGlossaryTerm() {
        let glossary = GlossaryMatcher::new(&["player"]);
        let text = "Hi {player}";
        let merged = merge_spans(&[
            PlaceholderMatcher.find_spans(text),
            FormattingCodeMatcher.find_spans(text),
            glossary.find_spans(text),
        ]);
        assert_eq!(texts(text, &merged), vec!["{player}"]);
        assert_eq!(merged[0].kind, TokenKind::Placeholder);
    }
}
