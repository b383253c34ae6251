/*!
 * Line-oriented parser and repairer for YAML localization files.
 *
 * Accepts the subset of YAML used by plugin and mod language files:
 * `key: value` pairs, nested mappings by indentation, block sequences of
 * scalars, comments and plain / single / double quoted scalars. Block
 * scalars and flow collections are kept verbatim and flagged for review.
 *
 * Common malformations are repaired while parsing. Every repair is
 * recorded as an `AppliedFix`; a well-formed file produces no fixes and is
 * written back byte-for-byte.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use super::model::{Document, Entry, Line, LineEnding, QuoteStyle, ValueKind, is_non_string_scalar};
use crate::errors::ParseError;

// @const: Well-formed `key: value` line
static KEY_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r##"^( *)("(?:[^"\\]|\\.)*"|'(?:[^']|'')*'|[^\s'"#:][^:]*?):(\s.*)?$"##)
        .expect("Invalid key line regex")
});

// @const: Plain identifier key with a malformed delimiter (`key:value`, `key :v`, `key:: v`)
static COLON_FIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^( *)([A-Za-z0-9_.\-]+)[ \t]*:+[ \t]*(.*)$").expect("Invalid colon regex")
});

// @const: Mapping inside a list item (`- name: value`)
static INLINE_MAPPING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r##"^(?:"[^"]*"|'[^']*'|[^\s'"#:{\[][^:]*?):(?:\s|$)"##).expect("Invalid mapping regex")
});

/// Category of an automatic repair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixKind {
    UnmatchedQuote,
    ColonNormalization,
    TabIndentation,
    ControlCharacters,
    BrokenEscape,
    PlainValueQuoting,
}

impl fmt::Display for FixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::UnmatchedQuote => "unmatched quote",
            Self::ColonNormalization => "colon normalization",
            Self::TabIndentation => "tab indentation",
            Self::ControlCharacters => "control characters",
            Self::BrokenEscape => "broken escape",
            Self::PlainValueQuoting => "plain value quoting",
        };
        f.write_str(label)
    }
}

/// A repair applied to one line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedFix {
    pub line: usize,
    pub kind: FixKind,
    pub before: String,
    pub after: String,
}

impl fmt::Display for AppliedFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}: {:?} -> {:?}", self.line, self.kind, self.before, self.after)
    }
}

/// A line or entry left untouched that a human should look at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewFlag {
    pub line: usize,
    pub key: Option<String>,
    pub reason: String,
}

impl fmt::Display for ReviewFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "line {} ({}): {}", self.line, key, self.reason),
            None => write!(f, "line {}: {}", self.line, self.reason),
        }
    }
}

/// Result of parsing: the document plus what was repaired and flagged
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub document: Document,
    pub fixes: Vec<AppliedFix>,
    pub review: Vec<ReviewFlag>,
}

impl ParsedDocument {
    /// Whether any repair changed the input
    pub fn was_repaired(&self) -> bool {
        !self.fixes.is_empty()
    }
}

/// Parse and repair a raw document
pub fn parse(raw: &str) -> Result<ParsedDocument, ParseError> {
    Parser::new(raw).run()
}

// @struct: Open mapping section on the indentation stack
struct Frame {
    indent: usize,
    name: String,
    // @field: Indentation of the section's children
    child_indent: usize,
    next_item: usize,
}

// @struct: A scalar value split out of a line
struct Scalar {
    raw: String,
    trailing: String,
    value: String,
    quote: QuoteStyle,
    kind: ValueKind,
    review: Option<&'static str>,
}

struct Parser {
    lines: Vec<String>,
    line_ending: LineEnding,
    trailing_newline: bool,
    bom: bool,
    out: Vec<Line>,
    entries: Vec<Entry>,
    fixes: Vec<AppliedFix>,
    review: Vec<ReviewFlag>,
    stack: Vec<Frame>,
    seen: HashMap<String, usize>,
    // @field: Lines indented deeper than this are kept verbatim
    skip_indent: Option<usize>,
    key_lines: usize,
    content_lines: usize,
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_content(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

fn is_list_item(trimmed: &str) -> bool {
    trimmed == "-" || trimmed.starts_with("- ")
}

fn is_stray_control(c: char) -> bool {
    ((c as u32) < 0x20 && c != '\t') || c == '\x7f'
}

impl Parser {
    fn new(raw: &str) -> Self {
        let (raw, bom) = match raw.strip_prefix('\u{feff}') {
            Some(rest) => (rest, true),
            None => (raw, false),
        };
        let line_ending = if raw.contains("\r\n") { LineEnding::CrLf } else { LineEnding::Lf };
        let trailing_newline = raw.ends_with('\n');

        let mut lines: Vec<String> = raw
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
            .collect();
        if trailing_newline {
            lines.pop();
        }

        Self {
            lines,
            line_ending,
            trailing_newline,
            bom,
            out: Vec::new(),
            entries: Vec::new(),
            fixes: Vec::new(),
            review: Vec::new(),
            stack: Vec::new(),
            seen: HashMap::new(),
            skip_indent: None,
            key_lines: 0,
            content_lines: 0,
        }
    }

    fn fix(&mut self, line: usize, kind: FixKind, before: &str, after: &str) {
        debug!("Repair on line {}: {}", line, kind);
        self.fixes.push(AppliedFix {
            line,
            kind,
            before: before.to_string(),
            after: after.to_string(),
        });
    }

    fn flag(&mut self, line: usize, key: Option<&str>, reason: &str) {
        warn!("Line {} needs manual review: {}", line, reason);
        self.review.push(ReviewFlag {
            line,
            key: key.map(str::to_string),
            reason: reason.to_string(),
        });
    }

    /// Line-level repairs that do not depend on structure
    fn normalize_lines(&mut self) {
        for i in 0..self.lines.len() {
            let original = self.lines[i].clone();

            if original.chars().any(is_stray_control) {
                let cleaned: String = original.chars().filter(|c| !is_stray_control(*c)).collect();
                self.fix(i + 1, FixKind::ControlCharacters, &original, &cleaned);
                self.lines[i] = cleaned;
            }

            let current = self.lines[i].clone();
            let body = current.trim_start_matches([' ', '\t']);
            let leading = &current[..current.len() - body.len()];
            if leading.contains('\t') {
                let fixed = format!("{}{}", leading.replace('\t', "  "), body);
                self.fix(i + 1, FixKind::TabIndentation, &current, &fixed);
                self.lines[i] = fixed;
            }
        }
    }

    fn run(mut self) -> Result<ParsedDocument, ParseError> {
        self.normalize_lines();

        for i in 0..self.lines.len() {
            let line = self.lines[i].clone();
            let trimmed = line.trim();
            let indent = indent_of(&line);

            if let Some(skip) = self.skip_indent {
                if trimmed.is_empty() || indent > skip {
                    self.out.push(Line::Verbatim(line));
                    continue;
                }
                self.skip_indent = None;
            }

            if !is_content(&line) || trimmed == "---" || trimmed == "..." {
                self.out.push(Line::Verbatim(line));
                continue;
            }
            self.content_lines += 1;

            if is_list_item(trimmed) {
                self.list_item(i, line, indent)?;
            } else {
                self.key_line(i, line, indent)?;
            }
        }

        if self.key_lines == 0 && self.content_lines > 0 {
            return Err(ParseError::NoKeyDelimiter {
                content_lines: self.content_lines,
            });
        }

        debug!(
            "Parsed {} entries from {} lines ({} fixes, {} review flags)",
            self.entries.len(),
            self.lines.len(),
            self.fixes.len(),
            self.review.len()
        );

        let mut document = Document::new(self.out, self.entries, self.line_ending, self.trailing_newline);
        document.bom = self.bom;
        Ok(ParsedDocument {
            document,
            fixes: self.fixes,
            review: self.review,
        })
    }

    /// Next content line after `i`, as (indent, trimmed text)
    fn next_content(&self, i: usize) -> Option<(usize, &str)> {
        self.lines[i + 1..]
            .iter()
            .find(|l| is_content(l))
            .map(|l| (indent_of(l), l.trim()))
    }

    /// Whether the scalar on line `i` continues on deeper, non-key lines
    fn continues_on_next_line(&self, i: usize, indent: usize) -> bool {
        match self.lines[i + 1..].iter().find(|l| !l.trim().is_empty()) {
            Some(next) => {
                let trimmed = next.trim();
                indent_of(next) > indent
                    && !trimmed.starts_with('#')
                    && !is_list_item(trimmed)
                    && !KEY_LINE.is_match(next.trim_start())
            }
            None => false,
        }
    }

    /// Dotted path of the open sections
    fn section_path(&self) -> String {
        self.stack
            .iter()
            .map(|f| key_segment(&f.name))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn path_with(&self, segment: &str) -> String {
        let parent = self.section_path();
        if parent.is_empty() {
            key_segment(segment).into_owned()
        } else {
            format!("{}.{}", parent, key_segment(segment))
        }
    }

    fn unrecognized(&mut self, i: usize, line: String) {
        self.flag(i + 1, None, "unrecognized line kept verbatim");
        self.out.push(Line::Verbatim(line));
    }

    fn key_line(&mut self, i: usize, mut line: String, indent: usize) -> Result<(), ParseError> {
        let well_formed = KEY_LINE
            .captures(&line)
            .map(|c| {
                let key = &c[2];
                key.starts_with(['"', '\'']) || key.trim_end() == key
            })
            .unwrap_or(false);

        if !well_formed {
            let normalized = COLON_FIX.captures(&line).map(|caps| {
                if caps[3].is_empty() {
                    format!("{}{}:", &caps[1], &caps[2])
                } else {
                    format!("{}{}: {}", &caps[1], &caps[2], &caps[3])
                }
            });
            if let Some(fixed) = normalized.filter(|f| *f != line) {
                self.fix(i + 1, FixKind::ColonNormalization, &line, &fixed);
                line = fixed;
            }
        }

        let parts = KEY_LINE.captures(&line).map(|caps| {
            let rest = caps.get(3).map(|m| m.as_str()).unwrap_or("");
            (unquote_key(caps[2].trim_end()), rest.trim_start().to_string())
        });
        let Some((name, value_part)) = parts else {
            self.unrecognized(i, line);
            return Ok(());
        };
        self.key_lines += 1;
        let prefix = line[..line.len() - value_part.len()].to_string();

        while self.stack.last().is_some_and(|f| f.indent >= indent) {
            self.stack.pop();
        }
        let key = self.path_with(&name);

        if value_part.is_empty() || value_part.starts_with('#') {
            let section_child = match self.next_content(i) {
                Some((next, _)) if next > indent => Some(next),
                Some((next, trimmed)) if next == indent && is_list_item(trimmed) => Some(next),
                _ => None,
            };
            if let Some(child_indent) = section_child {
                self.stack.push(Frame {
                    indent,
                    name,
                    child_indent,
                    next_item: 0,
                });
                self.out.push(Line::Verbatim(line));
                return Ok(());
            }

            let scalar = Scalar {
                raw: String::new(),
                trailing: value_part,
                value: String::new(),
                quote: QuoteStyle::Plain,
                kind: ValueKind::Empty,
                review: None,
            };
            return self.push_entry(i, key, prefix, scalar);
        }

        let scalar = self.scalar(i, indent, &prefix, &value_part);
        self.push_entry(i, key, prefix, scalar)
    }

    fn list_item(&mut self, i: usize, line: String, indent: usize) -> Result<(), ParseError> {
        while self
            .stack
            .last()
            .is_some_and(|f| f.indent > indent || (f.indent == indent && f.child_indent != indent))
        {
            self.stack.pop();
        }

        let parent_path = self.section_path();
        let Some(frame) = self.stack.last_mut().filter(|f| f.child_indent == indent) else {
            self.unrecognized(i, line);
            return Ok(());
        };
        let key = format!("{}[{}]", parent_path, frame.next_item);
        frame.next_item += 1;

        let after_dash = &line[indent + 1..];
        let value_part = after_dash.trim_start().to_string();
        let prefix = line[..line.len() - value_part.len()].to_string();

        if value_part.is_empty() || value_part.starts_with('#') {
            let nested = self.next_content(i).is_some_and(|(next, _)| next > indent);
            let scalar = Scalar {
                raw: String::new(),
                trailing: value_part,
                value: String::new(),
                quote: QuoteStyle::Plain,
                kind: if nested { ValueKind::Passthrough } else { ValueKind::Empty },
                review: nested.then_some("nested collection in list item"),
            };
            if nested {
                self.skip_indent = Some(indent);
            }
            return self.push_entry(i, key, prefix, scalar);
        }

        if INLINE_MAPPING.is_match(&value_part) {
            self.skip_indent = Some(indent);
            let scalar = passthrough(&value_part, "mapping inside list item");
            return self.push_entry(i, key, prefix, scalar);
        }

        let scalar = self.scalar(i, indent, &prefix, &value_part);
        self.push_entry(i, key, prefix, scalar)
    }

    /// Split and repair a non-empty scalar value
    fn scalar(&mut self, i: usize, indent: usize, prefix: &str, value_part: &str) -> Scalar {
        match value_part.chars().next() {
            Some('"') => self.double_quoted(i, indent, prefix, value_part),
            Some('\'') => self.single_quoted(i, indent, prefix, value_part),
            Some('|') | Some('>') => {
                self.skip_indent = Some(indent);
                passthrough(value_part, "block scalar kept verbatim")
            }
            Some('{') | Some('[') if is_flow_collection(value_part) => {
                passthrough(value_part, "flow collection kept verbatim")
            }
            Some('{') | Some('[') if is_open_flow(value_part) => {
                self.skip_indent = Some(indent);
                passthrough(value_part, "multi-line flow collection kept verbatim")
            }
            _ => self.plain(i, indent, prefix, value_part),
        }
    }

    fn double_quoted(&mut self, i: usize, indent: usize, prefix: &str, value_part: &str) -> Scalar {
        let (raw, trailing) = match closing_double(value_part) {
            Some(end) => {
                let after = &value_part[end + 1..];
                if !is_trailing_comment(after) {
                    return passthrough(value_part, "content after closing quote");
                }
                (value_part[..=end].to_string(), after.to_string())
            }
            None => {
                let body = value_part[1..].trim_end();
                if body.contains('"') || ends_with_odd_backslashes(body) {
                    return passthrough(value_part, "unmatched quote could not be repaired");
                }
                if self.continues_on_next_line(i, indent) {
                    self.skip_indent = Some(indent);
                    return passthrough(value_part, "multi-line quoted value kept verbatim");
                }
                let trailing = value_part[1 + body.len()..].to_string();
                let raw = format!("\"{}\"", body);
                self.fix(
                    i + 1,
                    FixKind::UnmatchedQuote,
                    &format!("{}{}", prefix, value_part),
                    &format!("{}{}{}", prefix, raw, trailing),
                );
                (raw, trailing)
            }
        };

        let body = &raw[1..raw.len() - 1];
        let raw = match repair_escapes(body) {
            Some(repaired) => {
                let fixed = format!("\"{}\"", repaired);
                self.fix(
                    i + 1,
                    FixKind::BrokenEscape,
                    &format!("{}{}{}", prefix, raw, trailing),
                    &format!("{}{}{}", prefix, fixed, trailing),
                );
                fixed
            }
            None => raw,
        };

        let value = decode_double(&raw[1..raw.len() - 1]);
        quoted_scalar(raw, trailing, value, QuoteStyle::Double)
    }

    fn single_quoted(&mut self, i: usize, indent: usize, prefix: &str, value_part: &str) -> Scalar {
        let (raw, trailing) = match closing_single(value_part) {
            Some(end) => {
                let after = &value_part[end + 1..];
                if !is_trailing_comment(after) {
                    return passthrough(value_part, "content after closing quote");
                }
                (value_part[..=end].to_string(), after.to_string())
            }
            None => {
                let body = value_part[1..].trim_end();
                if body.contains('\'') {
                    return passthrough(value_part, "unmatched quote could not be repaired");
                }
                if self.continues_on_next_line(i, indent) {
                    self.skip_indent = Some(indent);
                    return passthrough(value_part, "multi-line quoted value kept verbatim");
                }
                let trailing = value_part[1 + body.len()..].to_string();
                let raw = format!("'{}'", body);
                self.fix(
                    i + 1,
                    FixKind::UnmatchedQuote,
                    &format!("{}{}", prefix, value_part),
                    &format!("{}{}{}", prefix, raw, trailing),
                );
                (raw, trailing)
            }
        };

        let value = raw[1..raw.len() - 1].replace("''", "'");
        quoted_scalar(raw, trailing, value, QuoteStyle::Single)
    }

    fn plain(&mut self, i: usize, indent: usize, prefix: &str, value_part: &str) -> Scalar {
        let content_end = match value_part.find(" #").or_else(|| value_part.find("\t#")) {
            Some(pos) => value_part[..pos].trim_end().len(),
            None => value_part.trim_end().len(),
        };
        let content = &value_part[..content_end];
        let trailing = value_part[content_end..].to_string();

        if self.continues_on_next_line(i, indent) {
            self.skip_indent = Some(indent);
            return passthrough(value_part, "multi-line plain value kept verbatim");
        }

        if needs_quoting(content) {
            let (raw, quote) = QuoteStyle::Plain.encode(content);
            self.fix(
                i + 1,
                FixKind::PlainValueQuoting,
                &format!("{}{}", prefix, value_part),
                &format!("{}{}{}", prefix, raw, trailing),
            );
            return Scalar {
                raw,
                trailing,
                value: content.to_string(),
                quote,
                kind: ValueKind::Text,
                review: None,
            };
        }

        let kind = if is_non_string_scalar(content) { ValueKind::NonString } else { ValueKind::Text };
        Scalar {
            raw: content.to_string(),
            trailing,
            value: content.to_string(),
            quote: QuoteStyle::Plain,
            kind,
            review: None,
        }
    }

    fn push_entry(&mut self, i: usize, key: String, prefix: String, scalar: Scalar) -> Result<(), ParseError> {
        let line = i + 1;
        if let Some(&first_line) = self.seen.get(&key) {
            return Err(ParseError::DuplicateKey {
                key,
                first_line,
                second_line: line,
            });
        }
        self.seen.insert(key.clone(), line);

        if let Some(reason) = scalar.review {
            self.flag(line, Some(key.as_str()), reason);
        }

        let index = self.entries.len();
        self.entries.push(Entry {
            key,
            line,
            prefix,
            raw_value: scalar.raw,
            trailing: scalar.trailing,
            value: scalar.value,
            quote: scalar.quote,
            kind: scalar.kind,
            tokens: Vec::new(),
            intentionally_blank: false,
            needs_review: scalar.review.is_some(),
        });
        self.out.push(Line::Entry(index));
        Ok(())
    }
}

fn passthrough(value_part: &str, reason: &'static str) -> Scalar {
    let content = value_part.trim_end();
    Scalar {
        raw: content.to_string(),
        trailing: value_part[content.len()..].to_string(),
        value: content.to_string(),
        quote: QuoteStyle::Plain,
        kind: ValueKind::Passthrough,
        review: Some(reason),
    }
}

fn quoted_scalar(raw: String, trailing: String, value: String, quote: QuoteStyle) -> Scalar {
    let kind = if value.is_empty() { ValueKind::Empty } else { ValueKind::Text };
    Scalar {
        raw,
        trailing,
        value,
        quote,
        kind,
        review: None,
    }
}

/// Path segment for a key name; names containing path syntax are quoted
fn key_segment(name: &str) -> Cow<'_, str> {
    if name.contains(['.', '[', '"']) {
        Cow::Owned(format!("\"{}\"", name.replace('"', "\\\"")))
    } else {
        Cow::Borrowed(name)
    }
}

fn unquote_key(key: &str) -> String {
    if key.len() >= 2 && key.starts_with('"') && key.ends_with('"') {
        decode_double(&key[1..key.len() - 1])
    } else if key.len() >= 2 && key.starts_with('\'') && key.ends_with('\'') {
        key[1..key.len() - 1].replace("''", "'")
    } else {
        key.to_string()
    }
}

fn is_trailing_comment(after: &str) -> bool {
    let trimmed = after.trim_start();
    trimmed.is_empty() || (trimmed.starts_with('#') && trimmed.len() < after.len())
}

fn ends_with_odd_backslashes(body: &str) -> bool {
    body.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Byte index of the closing quote of a double-quoted value
fn closing_double(value: &str) -> Option<usize> {
    let bytes = value.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Byte index of the closing quote of a single-quoted value
fn closing_single(value: &str) -> Option<usize> {
    let bytes = value.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Some(i);
        }
        i += 1;
    }
    None
}

fn flow_content(value_part: &str) -> &str {
    match value_part.find(" #") {
        Some(pos) => value_part[..pos].trim_end(),
        None => value_part.trim_end(),
    }
}

fn is_flow_collection(value_part: &str) -> bool {
    let content = flow_content(value_part);
    let closer = if content.starts_with('{') { '}' } else { ']' };
    if content.len() < 2 || !content.ends_with(closer) {
        return false;
    }
    let inner = content[1..content.len() - 1].trim();
    inner.is_empty()
        || inner.contains(',')
        || inner.contains(": ")
        || (closer == ']' && is_non_string_scalar(inner))
}

fn is_open_flow(value_part: &str) -> bool {
    let content = flow_content(value_part);
    content.len() == 1 || content.ends_with(',')
}

fn needs_quoting(content: &str) -> bool {
    let Some(first) = content.chars().next() else {
        return false;
    };
    "&*!%@`{[".contains(first) || content.contains(": ") || content.ends_with(':')
}

fn is_valid_escape(chars: &[char], at: usize) -> bool {
    let hex_digits = |n: usize| {
        chars.len() > at + n && chars[at + 1..=at + n].iter().all(|c| c.is_ascii_hexdigit())
    };
    match chars[at] {
        '0' | 'a' | 'b' | 't' | '\t' | 'n' | 'v' | 'f' | 'r' | 'e' | ' ' | '"' | '/' | '\\' | 'N'
        | '_' | 'L' | 'P' => true,
        'x' => hex_digits(2),
        'u' => hex_digits(4),
        'U' => hex_digits(8),
        _ => false,
    }
}

/// Double the backslash of every invalid escape. `None` when nothing changed.
fn repair_escapes(body: &str) -> Option<String> {
    let chars: Vec<char> = body.chars().collect();
    let mut out = String::with_capacity(body.len() + 4);
    let mut changed = false;
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '\\' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        if i + 1 < chars.len() && is_valid_escape(&chars, i + 1) {
            out.push('\\');
            out.push(chars[i + 1]);
            i += 2;
        } else {
            out.push_str("\\\\");
            changed = true;
            i += 1;
        }
    }

    changed.then_some(out)
}

/// Decode the body of a double-quoted scalar
pub fn decode_double(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        let simple = match next {
            '0' => Some('\0'),
            'a' => Some('\x07'),
            'b' => Some('\x08'),
            't' | '\t' => Some('\t'),
            'n' => Some('\n'),
            'v' => Some('\x0b'),
            'f' => Some('\x0c'),
            'r' => Some('\r'),
            'e' => Some('\x1b'),
            ' ' => Some(' '),
            '"' => Some('"'),
            '/' => Some('/'),
            '\\' => Some('\\'),
            'N' => Some('\u{85}'),
            '_' => Some('\u{a0}'),
            'L' => Some('\u{2028}'),
            'P' => Some('\u{2029}'),
            _ => None,
        };
        if let Some(decoded) = simple {
            out.push(decoded);
            continue;
        }

        let width = match next {
            'x' => 2,
            'u' => 4,
            'U' => 8,
            _ => 0,
        };
        let digits: String = (0..width).filter_map(|_| chars.next_if(|c| c.is_ascii_hexdigit())).collect();
        match u32::from_str_radix(&digits, 16).ok().filter(|_| digits.len() == width && width > 0).and_then(char::from_u32) {
            Some(decoded) => out.push(decoded),
            None => {
                out.push('\\');
                out.push(next);
                out.push_str(&digits);
            }
        }
    }

    out
}
