/*!
 * Round-trip integrity verification.
 *
 * Compares the structural fingerprints of a source document and its
 * translation: entry count, key set, per-entry token multisets, empty
 * regressions and leftover shield markers.
 */

pub mod checker;

pub use checker::{IntegrityReport, IntegrityStatus, IntegrityViolation, verify};
