/*!
 * Document model for key-value localization files.
 *
 * A `Document` keeps every source line so that the file can be written back
 * byte-for-byte, plus the ordered list of entries that carry translatable
 * values. Lines that are not entries (comments, blanks, section headers,
 * block scalar bodies) are kept verbatim.
 */

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::shield::{Token, TokenKind, TokenShield};

// @const: Plain scalars YAML resolves to something other than a string
static NON_STRING_SCALAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?i:true|false|yes|no|on|off|null|~|[-+]?\.inf|\.nan)$|^[-+]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?$|^0x[0-9a-fA-F]+$|^0o[0-7]+$",
    )
    .expect("Invalid scalar regex")
});

/// Whether a plain scalar would be read as a number, boolean or null
pub fn is_non_string_scalar(value: &str) -> bool {
    NON_STRING_SCALAR.is_match(value)
}

/// How a scalar value is written in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStyle {
    /// Unquoted scalar
    Plain,
    /// `'...'` with `''` as the only escape
    Single,
    /// `"..."` with backslash escapes
    Double,
}

impl QuoteStyle {
    /// Encode a decoded value in this style, upgrading the style when the
    /// value cannot be represented in it. Returns the raw text and the style
    /// actually used.
    pub fn encode(self, value: &str) -> (String, QuoteStyle) {
        match self {
            Self::Plain if is_plain_safe(value) => (value.to_string(), Self::Plain),
            Self::Plain => {
                let style = if value.contains('\'') && !value.contains('"') && !has_control(value) {
                    Self::Single
                } else {
                    Self::Double
                };
                style.encode(value)
            }
            Self::Single if has_control(value) => Self::Double.encode(value),
            Self::Single => (format!("'{}'", value.replace('\'', "''")), Self::Single),
            Self::Double => (format!("\"{}\"", escape_double(value)), Self::Double),
        }
    }
}

fn has_control(value: &str) -> bool {
    value.chars().any(|c| c.is_control())
}

/// Whether a value can be written as a plain scalar without changing meaning
pub fn is_plain_safe(value: &str) -> bool {
    let Some(first) = value.chars().next() else {
        return false;
    };
    if value.trim() != value || has_control(value) {
        return false;
    }
    if "&*!%@`'\"|>{}[],#".contains(first) {
        return false;
    }
    if value == "-" || value.starts_with("- ") || value.starts_with("? ") || value.starts_with(": ")
    {
        return false;
    }
    if value.contains(": ") || value.contains(" #") || value.ends_with(':') {
        return false;
    }
    !is_non_string_scalar(value)
}

/// Escape a value for a double-quoted scalar
pub fn escape_double(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// What kind of value an entry holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// String value eligible for translation
    Text,
    /// No value (`key:` or `key: ""`), kept verbatim
    Empty,
    /// Number, boolean or null, kept verbatim
    NonString,
    /// Block scalar, flow collection or complex list item, kept verbatim
    Passthrough,
}

// @struct: Single key/value entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    // @field: Dotted key path, list items as `parent[n]`
    pub key: String,

    // @field: 1-based line number in the repaired document
    pub line: usize,

    // @field: Text before the value (indent, key, colon, separator)
    pub prefix: String,

    // @field: Value as written, quotes included
    pub raw_value: String,

    // @field: Whitespace and comment after the value
    pub trailing: String,

    // @field: Decoded value
    pub value: String,

    pub quote: QuoteStyle,

    pub kind: ValueKind,

    // @field: Protected tokens of the decoded value
    pub tokens: Vec<Token>,

    // @field: Allowed to become empty after translation
    pub intentionally_blank: bool,

    // @field: Flagged for manual review, never translated
    pub needs_review: bool,
}

impl Entry {
    /// Whether the value should be sent for translation
    pub fn is_translatable(&self) -> bool {
        self.kind == ValueKind::Text && !self.needs_review && !self.value.trim().is_empty()
    }

    /// Replace the decoded value and re-encode it. No-op for equal values,
    /// so untouched entries keep their exact source bytes.
    pub fn set_value(&mut self, value: &str) {
        if value == self.value {
            return;
        }
        let (raw, style) = self.quote.encode(value);
        self.raw_value = raw;
        self.quote = style;
        self.value = value.to_string();
    }

    /// The full line as it will be written
    pub fn render(&self) -> String {
        format!("{}{}{}", self.prefix, self.raw_value, self.trailing)
    }
}

/// One physical line of the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Comment, blank, section header or pass-through content
    Verbatim(String),
    /// Index into `Document::entries`
    Entry(usize),
}

/// Line terminator used by the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// Parsed localization document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub lines: Vec<Line>,
    pub entries: Vec<Entry>,
    pub line_ending: LineEnding,
    pub trailing_newline: bool,
    pub bom: bool,
    index: HashMap<String, usize>,
}

impl Document {
    /// Build a document from lines and entries; keys must already be unique
    pub fn new(lines: Vec<Line>, entries: Vec<Entry>, line_ending: LineEnding, trailing_newline: bool) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.key.clone(), i))
            .collect();
        Self {
            lines,
            entries,
            line_ending,
            trailing_newline,
            bom: false,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by its full key
    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// Mutable lookup by full key
    pub fn entry_mut(&mut self, key: &str) -> Option<&mut Entry> {
        match self.index.get(key) {
            Some(&i) => self.entries.get_mut(i),
            None => None,
        }
    }

    /// Keys in document order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    /// Detect and store the protected tokens of every entry
    pub fn annotate_tokens(&mut self, shield: &TokenShield) {
        for entry in &mut self.entries {
            entry.tokens = if entry.kind == ValueKind::Text {
                shield.detect(&entry.value)
            } else {
                Vec::new()
            };
        }
    }

    /// Flag entries whose values may legitimately become empty
    pub fn mark_intentionally_blank<S: AsRef<str>>(&mut self, keys: &[S]) {
        for key in keys {
            if let Some(entry) = self.entry_mut(key.as_ref()) {
                entry.intentionally_blank = true;
            }
        }
    }

    /// Structural snapshot used for integrity comparison.
    ///
    /// Tokens are re-detected with `shield` rather than read from the entries
    /// so that a translated document is judged on what it actually contains.
    pub fn fingerprint(&self, shield: &TokenShield) -> Fingerprint {
        let tokens = self
            .entries
            .iter()
            .map(|entry| {
                let mut multiset: BTreeMap<(TokenKind, String), usize> = BTreeMap::new();
                if entry.kind == ValueKind::Text {
                    for token in shield.detect(&entry.value) {
                        *multiset.entry((token.kind, token.canonical)).or_insert(0) += 1;
                    }
                }
                (entry.key.clone(), multiset)
            })
            .collect();

        Fingerprint {
            entry_count: self.entries.len(),
            keys: self.entries.iter().map(|e| e.key.clone()).collect(),
            tokens,
        }
    }
}

/// Token multiset of one entry: (kind, canonical text) -> occurrences
pub type TokenMultiset = BTreeMap<(TokenKind, String), usize>;

/// Immutable structural summary of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub entry_count: usize,
    /// Keys in document order
    pub keys: Vec<String>,
    pub tokens: BTreeMap<String, TokenMultiset>,
}

impl Fingerprint {
    /// Total token count over all entries
    pub fn token_count(&self) -> usize {
        self.tokens.values().flat_map(|m| m.values()).sum()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} entries, {} tokens", self.entry_count, self.token_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(value: &str, quote: QuoteStyle, raw: &str) -> Entry {
        Entry {
            key: "k".into(),
            line: 1,
            prefix: "k: ".into(),
            raw_value: raw.into(),
            trailing: String::new(),
            value: value.into(),
            quote,
            kind: ValueKind::Text,
            tokens: Vec::new(),
            intentionally_blank: false,
            needs_review: false,
        }
    }

    #[test]
    fn test_setValue_withSameValue_shouldKeepRawBytes() {
        let mut e = entry("Hi", QuoteStyle::Double, "\"Hi\"");
        e.set_value("Hi");
        assert_eq!(e.render(), "k: \"Hi\"");
    }

    #[test]
    fn test_setValue_withDoubleStyle_shouldEscape() {
        let mut e = entry("Hi", QuoteStyle::Double, "\"Hi\"");
        e.set_value("Say \"hi\"\nnow \\o/");
        assert_eq!(e.raw_value, r#""Say \"hi\"\nnow \\o/""#);
    }

    #[test]
    fn test_setValue_withSingleStyle_shouldDoubleApostrophes() {
        let mut e = entry("Hi", QuoteStyle::Single, "'Hi'");
        e.set_value("l'arc");
        assert_eq!(e.raw_value, "'l''arc'");
        assert_eq!(e.quote, QuoteStyle::Single);
    }

    #[test]
    fn test_setValue_withPlainNeedingQuotes_shouldUpgrade() {
        let mut e = entry("Hi", QuoteStyle::Plain, "Hi");
        e.set_value("&aCiao: tutti");
        assert_eq!(e.raw_value, "\"&aCiao: tutti\"");
        assert_eq!(e.quote, QuoteStyle::Double);

        let mut plain = entry("Hi", QuoteStyle::Plain, "Hi");
        plain.set_value("C'est");
        assert_eq!(plain.raw_value, "C'est");
        plain.set_value("'Quoted' start");
        assert_eq!(plain.raw_value, "'''Quoted'' start'");
        assert_eq!(plain.quote, QuoteStyle::Single);
    }

    #[test]
    fn test_isPlainSafe_shouldRejectIndicatorsAndScalars() {
        assert!(is_plain_safe("Hello world"));
        assert!(!is_plain_safe("&aHello"));
        assert!(!is_plain_safe("true"));
        assert!(!is_plain_safe("42"));
        assert!(!is_plain_safe("Note: this"));
        assert!(!is_plain_safe(" padded"));
    }

    #[test]
    fn test_isNonStringScalar_shouldRecognizeYamlScalars() {
        for v in ["true", "No", "null", "~", "12", "-3.5", "1e10", "0x1F", ".inf"] {
            assert!(is_non_string_scalar(v), "{v}");
        }
        for v in ["Yes please", "12 apples", "v1.2"] {
            assert!(!is_non_string_scalar(v), "{v}");
        }
    }
}
