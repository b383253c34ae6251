/*!
 * Post-translation cleanup of masked values.
 *
 * Runs on the provider's answer before markers are restored, so protected
 * tokens can never be altered by a cleanup rule. Each rule only undoes
 * something the provider introduced; patterns already present in the
 * source value are left alone.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::shield::masking::MARKER_REGEX;

static SPACE_RUN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").expect("Invalid space regex"));

// @const: Replacement for a doubled apostrophe
const TYPOGRAPHIC_APOSTROPHE: &str = "\u{2019}";

/// Apply every cleanup rule to a translated masked value
pub fn post_fix(masked_source: &str, masked_translated: &str) -> String {
    let text = fix_doubled_apostrophes(masked_source, masked_translated);
    let text = align_marker_spacing(masked_source, &text);
    let text = collapse_spaces(masked_source, &text);
    restore_edge_whitespace(masked_source, &text)
}

/// Doubled apostrophes (YAML single-quote escaping leaking into the
/// translation) become a typographic apostrophe
pub fn fix_doubled_apostrophes(source: &str, translated: &str) -> String {
    if source.contains("''") {
        translated.to_string()
    } else {
        translated.replace("''", TYPOGRAPHIC_APOSTROPHE)
    }
}

/// Marker index -> (glued to the text before, glued to the text after)
fn glue_map(source: &str) -> HashMap<usize, (bool, bool)> {
    MARKER_REGEX
        .captures_iter(source)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let index = caps[1].parse::<usize>().ok()?;
            let left = source[..whole.start()].chars().next_back().is_some_and(|c| !c.is_whitespace());
            let right = source[whole.end()..].chars().next().is_some_and(|c| !c.is_whitespace());
            Some((index, (left, right)))
        })
        .collect()
}

/// Remove whitespace the provider inserted next to a marker that was glued
/// to its neighbour in the source (`&aHello` -> `[#001]Hello`, never
/// `[#001] Ciao`)
pub fn align_marker_spacing(source: &str, translated: &str) -> String {
    let glue = glue_map(source);
    if glue.values().all(|(left, right)| !left && !right) {
        return translated.to_string();
    }

    let mut out = String::with_capacity(translated.len());
    let mut cursor = 0;
    let mut strip_next_leading = false;

    for caps in MARKER_REGEX.captures_iter(translated) {
        let Some(whole) = caps.get(0) else { continue };
        let (left, right) = caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|i| glue.get(&i).copied())
            .unwrap_or((false, false));

        let mut between = &translated[cursor..whole.start()];
        if strip_next_leading {
            between = between.trim_start_matches([' ', '\t']);
        }
        if left && !(out.is_empty() && between.trim().is_empty()) {
            between = between.trim_end_matches([' ', '\t']);
        }

        out.push_str(between);
        out.push_str(whole.as_str());
        cursor = whole.end();
        strip_next_leading = right;
    }

    let mut rest = &translated[cursor..];
    if strip_next_leading {
        rest = rest.trim_start_matches([' ', '\t']);
    }
    out.push_str(rest);
    out
}

/// Collapse runs of spaces unless the source itself has them
pub fn collapse_spaces(source: &str, translated: &str) -> String {
    if SPACE_RUN_REGEX.is_match(source.trim()) {
        return translated.to_string();
    }
    let (lead, body, trail) = split_edges(translated);
    format!("{}{}{}", lead, SPACE_RUN_REGEX.replace_all(body, " "), trail)
}

/// Give the translation exactly the source's leading and trailing whitespace
pub fn restore_edge_whitespace(source: &str, translated: &str) -> String {
    let (lead, _, trail) = split_edges(source);
    let body = translated.trim();
    if body.is_empty() {
        return String::new();
    }
    format!("{}{}{}", lead, body, trail)
}

fn split_edges(text: &str) -> (&str, &str, &str) {
    let body = text.trim();
    if body.is_empty() {
        return (text, "", "");
    }
    let start = text.len() - text.trim_start().len();
    let end = start + body.len();
    (&text[..start], body, &text[end..])
}
