/*!
 * # mclt - Minecraft Localization Translator
 *
 * A Rust library for translating YAML localization files of Minecraft
 * plugins without breaking placeholders, colour codes or game terms.
 *
 * ## Features
 *
 * - Shield placeholders (`{count}`, `%player%`, `%s`), colour and style
 *   codes (`&a`, `§l`, `<red>`) and glossary terms behind inert markers
 * - Parse line by line with conservative structural repairs
 *   (unterminated quotes, tabs, stray quotes) and manual-review flags
 * - Translate using various providers with retry, backoff and fallback:
 *   - Google Translate (keyless web endpoint or Cloud API)
 *   - Ollama (local LLM)
 *   - OpenAI and LM Studio (OpenAI-compatible API)
 *   - Anthropic API
 * - Verify the round trip: entry count, keys and token multisets
 * - Write a manifest of fixes, reverted entries and integrity violations
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `shield`: token detection, masking and unmasking
 * - `document`: localization document model, parser and writer
 * - `translation`: provider adapter, throttling and post-translation cleanup
 * - `providers`: client implementations for translation services
 * - `integrity`: source/translation fingerprint comparison
 * - `pipeline`: per-document orchestration and the run manifest
 * - `app_controller`: file and folder runs, environment checks
 * - `app_config`: configuration management
 * - `file_utils`: file system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod document;
pub mod errors;
pub mod file_utils;
pub mod integrity;
pub mod language_utils;
pub mod pipeline;
pub mod providers;
pub mod shield;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use document::{Document, Entry, ParsedDocument, parse};
pub use errors::{LostToken, ParseError, ProviderError, TokenLossError, TranslationError};
pub use integrity::{IntegrityReport, IntegrityStatus, verify};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use pipeline::{Manifest, RunOutcome, RunStatus, TranslationPipeline};
pub use shield::{TokenKind, TokenShield};
pub use translation::TranslationAdapter;
