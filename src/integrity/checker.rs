/*!
 * Structural comparison of a source document and its translation.
 *
 * Checks are independent and all of them run; every problem found becomes
 * one `IntegrityViolation`. A report with any violation is `Degraded`,
 * which never stops the output from being written.
 */

use log::debug;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::document::{Document, Fingerprint, TokenMultiset};
use crate::shield::{TokenKind, TokenShield};

/// Overall result of the integrity check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityStatus {
    Passed,
    Degraded,
}

/// Types of integrity issues
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntegrityViolation {
    /// Different number of entries
    EntryCountMismatch { source: usize, translated: usize },
    /// Key of the source missing from the translation
    MissingKey { key: String },
    /// Key only present in the translation
    UnexpectedKey { key: String },
    /// Token occurs fewer times than in the source
    MissingToken {
        key: String,
        kind: TokenKind,
        canonical: String,
        expected: usize,
        found: usize,
    },
    /// Token occurs more times than in the source
    DuplicatedToken {
        key: String,
        kind: TokenKind,
        canonical: String,
        expected: usize,
        found: usize,
    },
    /// Placeholder or formatting code that the source value does not have
    ForeignToken {
        key: String,
        kind: TokenKind,
        canonical: String,
    },
    /// Non-empty value became empty
    EmptyValue { key: String },
    /// Shield marker left in the output
    LeftoverMarker { key: String, count: usize },
}

impl IntegrityViolation {
    /// Key of the entry concerned, if the violation is about one entry
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::EntryCountMismatch { .. } => None,
            Self::MissingKey { key }
            | Self::UnexpectedKey { key }
            | Self::MissingToken { key, .. }
            | Self::DuplicatedToken { key, .. }
            | Self::ForeignToken { key, .. }
            | Self::EmptyValue { key }
            | Self::LeftoverMarker { key, .. } => Some(key),
        }
    }
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EntryCountMismatch { source, translated } => {
                write!(f, "Entry count mismatch: source has {}, translation has {}", source, translated)
            }
            Self::MissingKey { key } => write!(f, "{}: key missing from translation", key),
            Self::UnexpectedKey { key } => write!(f, "{}: key not present in source", key),
            Self::MissingToken { key, kind, canonical, expected, found } => write!(
                f,
                "{}: {} '{}' missing (expected {}, found {})",
                key, kind, canonical, expected, found
            ),
            Self::DuplicatedToken { key, kind, canonical, expected, found } => write!(
                f,
                "{}: {} '{}' duplicated (expected {}, found {})",
                key, kind, canonical, expected, found
            ),
            Self::ForeignToken { key, kind, canonical } => {
                write!(f, "{}: foreign {} '{}'", key, kind, canonical)
            }
            Self::EmptyValue { key } => write!(f, "{}: value became empty", key),
            Self::LeftoverMarker { key, count } => {
                write!(f, "{}: {} leftover shield marker(s)", key, count)
            }
        }
    }
}

/// Result of comparing two documents
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub status: IntegrityStatus,
    pub violations: Vec<IntegrityViolation>,
    pub source: Fingerprint,
    pub translated: Fingerprint,
}

impl IntegrityReport {
    pub fn is_passed(&self) -> bool {
        self.status == IntegrityStatus::Passed
    }

    /// Keys with at least one violation, sorted
    pub fn affected_keys(&self) -> BTreeSet<&str> {
        self.violations.iter().filter_map(|v| v.key()).collect()
    }
}

fn compare_tokens(key: &str, source: &TokenMultiset, translated: &TokenMultiset, out: &mut Vec<IntegrityViolation>) {
    for ((kind, canonical), &expected) in source {
        let found = translated.get(&(*kind, canonical.clone())).copied().unwrap_or(0);
        if found < expected {
            out.push(IntegrityViolation::MissingToken {
                key: key.to_string(),
                kind: *kind,
                canonical: canonical.clone(),
                expected,
                found,
            });
        } else if found > expected {
            out.push(IntegrityViolation::DuplicatedToken {
                key: key.to_string(),
                kind: *kind,
                canonical: canonical.clone(),
                expected,
                found,
            });
        }
    }

    for (kind, canonical) in translated.keys() {
        // Target text may legitimately contain a glossary word; leftover
        // markers are reported by their own check
        if *kind == TokenKind::GlossaryTerm || TokenShield::is_only_markers(canonical) {
            continue;
        }
        if !source.contains_key(&(*kind, canonical.clone())) {
            out.push(IntegrityViolation::ForeignToken {
                key: key.to_string(),
                kind: *kind,
                canonical: canonical.clone(),
            });
        }
    }
}

/// Compare a source document with its translation
pub fn verify(source: &Document, translated: &Document, shield: &TokenShield) -> IntegrityReport {
    let source_fp = source.fingerprint(shield);
    let translated_fp = translated.fingerprint(shield);
    let mut violations = Vec::new();

    // (a) entry count
    if source_fp.entry_count != translated_fp.entry_count {
        violations.push(IntegrityViolation::EntryCountMismatch {
            source: source_fp.entry_count,
            translated: translated_fp.entry_count,
        });
    }

    // (b) key set
    let source_keys: BTreeSet<&str> = source_fp.keys.iter().map(String::as_str).collect();
    let translated_keys: BTreeSet<&str> = translated_fp.keys.iter().map(String::as_str).collect();
    for key in source_keys.difference(&translated_keys) {
        violations.push(IntegrityViolation::MissingKey { key: key.to_string() });
    }
    for key in translated_keys.difference(&source_keys) {
        violations.push(IntegrityViolation::UnexpectedKey { key: key.to_string() });
    }

    for entry in &source.entries {
        let Some(translated_entry) = translated.entry(&entry.key) else {
            continue;
        };

        // (c) tokens
        let empty = TokenMultiset::new();
        let source_tokens = source_fp.tokens.get(&entry.key).unwrap_or(&empty);
        let translated_tokens = translated_fp.tokens.get(&entry.key).unwrap_or(&empty);
        compare_tokens(&entry.key, source_tokens, translated_tokens, &mut violations);

        // (d) empty regression
        if !entry.value.trim().is_empty()
            && translated_entry.value.trim().is_empty()
            && !entry.intentionally_blank
        {
            violations.push(IntegrityViolation::EmptyValue { key: entry.key.clone() });
        }

        // (e) leftover markers
        let leftover = TokenShield::count_markers(&translated_entry.value)
            .saturating_sub(TokenShield::count_markers(&entry.value));
        if leftover > 0 {
            violations.push(IntegrityViolation::LeftoverMarker {
                key: entry.key.clone(),
                count: leftover,
            });
        }
    }

    let status = if violations.is_empty() {
        IntegrityStatus::Passed
    } else {
        IntegrityStatus::Degraded
    };
    debug!(
        "Integrity check: {} -> {} ({} violation(s))",
        source_fp,
        translated_fp,
        violations.len()
    );

    IntegrityReport {
        status,
        violations,
        source: source_fp,
        translated: translated_fp,
    }
}
