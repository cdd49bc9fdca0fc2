//! Strict parser -- the sole authority on whether recovery has succeeded.
//!
//! Nothing downstream ever works with text that has not passed through
//! here. Failures carry the byte offset and a window of surrounding text
//! so diagnostics can show where a document went wrong.

use serde_json::Value;
use std::fmt;

/// How many characters of surrounding text to capture on failure.
const CONTEXT_RADIUS: usize = 50;

/// A strict parse failure with location diagnostics.
#[derive(Debug, Clone)]
pub struct ParseFailure {
    /// Byte offset of the error position within the input.
    pub offset: usize,
    /// Up to 50 characters either side of the failure point.
    pub context: String,
    /// The underlying parser message.
    pub message: String,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at byte {} near {:?}",
            self.message, self.offset, self.context
        )
    }
}

impl std::error::Error for ParseFailure {}

/// Parse text as JSON with no leniency.
///
/// Accepts any JSON value at the top level; callers that need an object
/// check the shape themselves.
pub fn parse_strict(text: &str) -> Result<Value, ParseFailure> {
    serde_json::from_str(text).map_err(|err| {
        let offset = byte_offset(text, err.line(), err.column());
        ParseFailure {
            offset,
            context: context_window(text, offset),
            message: err.to_string(),
        }
    })
}

/// Translate serde_json's 1-based line/column into a byte offset.
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let mut offset = 0;
    for (idx, l) in text.split('\n').enumerate() {
        if idx + 1 == line {
            // Column is 1-based and counts bytes on the line.
            return (offset + column.saturating_sub(1)).min(text.len());
        }
        offset += l.len() + 1;
    }
    text.len()
}

/// A window of up to `CONTEXT_RADIUS` characters either side of `offset`,
/// clamped to char boundaries.
fn context_window(text: &str, offset: usize) -> String {
    let offset = offset.min(text.len());
    let mut start = offset;
    let mut end = offset;
    let mut taken = 0;
    while start > 0 && taken < CONTEXT_RADIUS {
        start -= 1;
        while start > 0 && !text.is_char_boundary(start) {
            start -= 1;
        }
        taken += 1;
    }
    taken = 0;
    while end < text.len() && taken < CONTEXT_RADIUS {
        end += 1;
        while end < text.len() && !text.is_char_boundary(end) {
            end += 1;
        }
        taken += 1;
    }
    text[start..end].to_string()
}
