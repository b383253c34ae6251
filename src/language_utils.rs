use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Localization files and translation APIs name languages in several ways:
/// ISO 639-1 (`it`), ISO 639-2 (`ita`, `fre`), and Minecraft style locales
/// with a region (`pt_BR`, `zh-CN`). These helpers validate and convert
/// between them.

/// Source language value that lets the provider detect the language
pub const AUTO_DETECT: &str = "auto";

// @const: ISO 639-2/B codes that differ from their 639-2/T form
const BIBLIOGRAPHIC_CODES: [(&str, &str); 18] = [
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

/// Whether the code asks for automatic source detection
pub fn is_auto(code: &str) -> bool {
    code.trim().eq_ignore_ascii_case(AUTO_DETECT)
}

/// Split a locale such as `pt_BR` or `zh-CN` into language and region
pub fn split_region(code: &str) -> (String, Option<String>) {
    let code = code.trim();
    match code.split_once(['_', '-']) {
        Some((base, region)) if !region.is_empty() => {
            (base.to_lowercase(), Some(region.to_uppercase()))
        }
        _ => (code.to_lowercase(), None),
    }
}

fn bibliographic_to_terminologic(code: &str) -> Option<&'static str> {
    BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(b, _)| *b == code)
        .map(|(_, t)| *t)
}

/// Validate if a language code (optionally with a region) is a valid ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let (base, _) = split_region(code);

    match base.len() {
        2 if Language::from_639_1(&base).is_some() => Ok(LanguageCodeType::Part1),
        3 if Language::from_639_3(&base).is_some() => Ok(LanguageCodeType::Part2T),
        3 if bibliographic_to_terminologic(&base).is_some() => Ok(LanguageCodeType::Part2B),
        _ => Err(anyhow!("Invalid language code: {}", code)),
    }
}

/// Normalize a language code to ISO 639-2/T (3-letter) format, dropping any region
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let (base, _) = split_region(code);

    match validate_language_code(&base)? {
        LanguageCodeType::Part1 => Language::from_639_1(&base)
            .map(|lang| lang.to_639_3().to_string())
            .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code)),
        LanguageCodeType::Part2T => Ok(base),
        LanguageCodeType::Part2B => bibliographic_to_terminologic(&base)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code)),
    }
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible.
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists.
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let part2t = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&part2t)
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;

    Ok(lang.to_639_1().map(str::to_string).unwrap_or(part2t))
}

/// Code to send to a translation API: ISO 639-1 where one exists, with the
/// region kept as `xx-RR` (e.g. `pt-BR`, `zh-CN`), or `auto` unchanged
pub fn provider_language_code(code: &str) -> Result<String> {
    if is_auto(code) {
        return Ok(AUTO_DETECT.to_string());
    }
    let base = normalize_to_part1_or_part2t(code)?;
    Ok(match split_region(code).1 {
        Some(region) => format!("{}-{}", base, region),
        None => base,
    })
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    if is_auto(code) {
        return Ok("the detected source language".to_string());
    }
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}
