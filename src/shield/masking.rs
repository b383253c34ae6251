/*!
 * Masking and unmasking of protected tokens.
 *
 * Masking replaces every detected token with a numbered marker `[#NNN]`
 * which translation services pass through unchanged. Unmasking restores
 * the exact source text of each token and reports every marker that
 * went missing.
 */

use log::trace;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::matchers::{
    FormattingCodeMatcher, GlossaryMatcher, PlaceholderMatcher, TokenMatcher, merge_spans,
};
use super::Token;
use crate::errors::{LostToken, TokenLossError};

/// Marker shapes as they come back from providers: `[#001]`, `[# 1]`, `[ #001 ]`
pub(crate) static MARKER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\s*#\s*(\d+)\s*\]").expect("Invalid marker regex"));

/// A value with its tokens replaced by markers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShieldedValue {
    /// Text sent to translation providers
    pub masked: String,
    /// Tokens in marker order; marker `n` refers to `tokens[n - 1]`
    pub tokens: Vec<Token>,
}

impl ShieldedValue {
    /// Whether the value consists of nothing but markers and whitespace
    pub fn is_only_markers(&self) -> bool {
        TokenShield::is_only_markers(&self.masked)
    }
}

/// Detects, masks and restores protected tokens
pub struct TokenShield {
    // @field: Matchers in priority order (earlier wins on equal span length)
    matchers: Vec<Box<dyn TokenMatcher>>,
}

impl std::fmt::Debug for TokenShield {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<_> = self.matchers.iter().map(|m| m.kind()).collect();
        f.debug_struct("TokenShield").field("matchers", &kinds).finish()
    }
}

impl Default for TokenShield {
    fn default() -> Self {
        Self::standard(true, true, &[] as &[&str])
    }
}

impl TokenShield {
    /// Create a shield from an explicit list of matchers
    pub fn new(matchers: Vec<Box<dyn TokenMatcher>>) -> Self {
        Self { matchers }
    }

    /// Create the standard shield: placeholders, then formatting codes, then glossary terms
    pub fn standard<S: AsRef<str>>(
        protect_placeholders: bool,
        protect_formatting: bool,
        glossary: &[S],
    ) -> Self {
        let mut matchers: Vec<Box<dyn TokenMatcher>> = Vec::new();
        if protect_placeholders {
            matchers.push(Box::new(PlaceholderMatcher));
        }
        if protect_formatting {
            matchers.push(Box::new(FormattingCodeMatcher));
        }
        let glossary = GlossaryMatcher::new(glossary);
        if !glossary.is_empty() {
            matchers.push(Box::new(glossary));
        }
        Self::new(matchers)
    }

    /// Marker text for the 1-based token index
    pub fn marker(index: usize) -> String {
        format!("[#{:03}]", index)
    }

    /// Detect all protected tokens in `text`, sorted by position
    pub fn detect(&self, text: &str) -> Vec<Token> {
        let groups: Vec<_> = self.matchers.iter().map(|m| m.find_spans(text)).collect();
        merge_spans(&groups)
            .into_iter()
            .map(|span| Token {
                kind: span.kind,
                start: span.start,
                end: span.end,
                canonical: text[span.start..span.end].to_string(),
            })
            .collect()
    }

    /// Replace every protected token with its marker
    pub fn mask(&self, text: &str) -> ShieldedValue {
        Self::mask_detected(text, self.detect(text))
    }

    /// Mask `text` with tokens already detected in it, sorted by position
    pub fn mask_detected(text: &str, tokens: Vec<Token>) -> ShieldedValue {
        let mut masked = String::with_capacity(text.len() + tokens.len() * 6);
        let mut cursor = 0;

        for (i, token) in tokens.iter().enumerate() {
            masked.push_str(&text[cursor..token.start]);
            masked.push_str(&Self::marker(i + 1));
            cursor = token.end;
        }
        masked.push_str(&text[cursor..]);

        trace!("Masked {} token(s): {:?}", tokens.len(), masked);
        ShieldedValue { masked, tokens }
    }

    /// Restore tokens in a translated value.
    ///
    /// Markers are matched tolerantly (providers sometimes add spaces inside
    /// the brackets). Markers with an unknown index are left as they are so
    /// the integrity check can report them. Fails listing every token whose
    /// marker is absent.
    pub fn unmask(&self, translated: &str, tokens: &[Token]) -> Result<String, TokenLossError> {
        let mut seen = vec![false; tokens.len()];

        let restored = MARKER_REGEX.replace_all(translated, |caps: &Captures| {
            let index = caps[1].parse::<usize>().unwrap_or(0);
            match index.checked_sub(1).and_then(|i| tokens.get(i).map(|t| (i, t))) {
                Some((i, token)) => {
                    seen[i] = true;
                    token.canonical.clone()
                }
                None => caps[0].to_string(),
            }
        });

        let lost: Vec<LostToken> = tokens
            .iter()
            .zip(&seen)
            .enumerate()
            .filter(|(_, (_, seen))| !**seen)
            .map(|(i, (token, _))| LostToken {
                marker: Self::marker(i + 1),
                kind: token.kind,
                canonical: token.canonical.clone(),
            })
            .collect();
        if !lost.is_empty() {
            return Err(TokenLossError { lost });
        }

        Ok(restored.into_owned())
    }

    /// Whether `text` contains nothing but markers and whitespace
    pub fn is_only_markers(text: &str) -> bool {
        !text.trim().is_empty() && MARKER_REGEX.replace_all(text, "").trim().is_empty()
    }

    /// Number of marker-shaped substrings in `text`
    pub fn count_markers(text: &str) -> usize {
        MARKER_REGEX.find_iter(text).count()
    }
}
