/*!
 * Localization document handling.
 *
 * - `model`: entries, lines, quote styles and the structural fingerprint
 * - `parser`: line-oriented parsing with conservative repairs
 * - `writer`: byte-preserving re-emission
 */

pub mod model;
pub mod parser;
pub mod writer;

pub use model::{Document, Entry, Fingerprint, Line, LineEnding, QuoteStyle, TokenMultiset, ValueKind};
pub use parser::{AppliedFix, FixKind, ParsedDocument, ReviewFlag, parse};
pub use writer::{render, write_document};
