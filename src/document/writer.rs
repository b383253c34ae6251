/*!
 * Re-emits a `Document` as text.
 *
 * Verbatim lines and untouched entries are written exactly as read; only
 * entries whose value changed carry new bytes. Line endings, the final
 * newline and a byte order mark are preserved.
 */

use anyhow::Result;
use std::path::Path;

use super::model::{Document, Line};
use crate::file_utils::FileManager;

/// Render the document to a string
pub fn render(document: &Document) -> String {
    let newline = document.line_ending.as_str();
    let mut out = String::new();

    if document.bom {
        out.push('\u{feff}');
    }

    for (i, line) in document.lines.iter().enumerate() {
        if i > 0 {
            out.push_str(newline);
        }
        match line {
            Line::Verbatim(text) => out.push_str(text),
            Line::Entry(index) => match document.entries.get(*index) {
                Some(entry) => out.push_str(&entry.render()),
                None => log::error!("Dangling entry index {} in document lines", index),
            },
        }
    }

    if document.trailing_newline {
        out.push_str(newline);
    }
    out
}

/// Render the document and write it to `path`
pub fn write_document<P: AsRef<Path>>(document: &Document, path: P) -> Result<()> {
    FileManager::write_to_file(path, &render(document))
}
