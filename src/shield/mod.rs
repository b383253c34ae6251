/*!
 * Token shielding for translation-safe values.
 *
 * Localization values carry substrings a translation service must never
 * touch: substitution placeholders (`{count}`, `%player%`, `%s`), colour and
 * style codes (`&a`, `§l`, `<red>`), and protected game terms (`Nether`,
 * `Chunk`). This module finds those spans, swaps them for inert markers
 * before translation and puts them back afterwards.
 *
 * - `matchers`: independent span detectors and the pure merge step
 * - `masking`: the `TokenShield` that masks and unmasks values
 */

use serde::Serialize;
use std::fmt;

pub mod masking;
pub mod matchers;

pub use masking::{ShieldedValue, TokenShield};
pub use matchers::{
    FormattingCodeMatcher, GlossaryMatcher, PlaceholderMatcher, Span, TokenMatcher, merge_spans,
};

/// Category of a protected span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Substitution marker filled in at runtime (`{count}`, `%s`, `%player%`)
    Placeholder,
    /// Colour, style or layout code (`&a`, `§l`, `<bold>`, line breaks)
    FormattingCode,
    /// Configured term that must keep its source spelling
    GlossaryTerm,
}

impl TokenKind {
    /// Lowercase human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            Self::Placeholder => "placeholder",
            Self::FormattingCode => "formatting code",
            Self::GlossaryTerm => "glossary term",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A protected span inside a value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// What kind of span this is
    pub kind: TokenKind,
    /// Byte offset of the span start in the original value
    pub start: usize,
    /// Byte offset one past the span end in the original value
    pub end: usize,
    /// Exact source text of the span
    pub canonical: String,
}

impl Token {
    /// Identity used for integrity comparison (offsets may legitimately move)
    pub fn identity(&self) -> (TokenKind, &str) {
        (self.kind, self.canonical.as_str())
    }
}
