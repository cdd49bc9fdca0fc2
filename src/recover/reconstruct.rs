//! Fragment reconstructor -- last-resort salvage for text the repairer
//! could not turn into JSON.
//!
//! Works on raw sanitized text, not on a parse tree: it hunts for the two
//! anchor fields (title and level), then scavenges whatever locally valid
//! fragments it can find for the list fields. Every fragment that is kept
//! must strict-parse on its own; fragments that do not are replaced with
//! minimal placeholders so the result always has the full lesson shape.
//! Reconstructed output is marked so it always goes through the
//! completeness check and repair path downstream.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use thiserror::Error;

use super::parse::parse_strict;

#[derive(Debug, Error)]
pub enum ReconstructError {
    #[error("no recognizable lesson anchors (title and level) in response text")]
    MissingAnchors,
}

static TITLE_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"?\btitle\b"?\s*[:=]\s*"((?:[^"\\]|\\.)+)""#).unwrap()
});

static LEVEL_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"?\blevel\b"?\s*[:=]\s*"((?:[^"\\]|\\.)+)""#).unwrap()
});

static QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""((?:[^"\\]|\\.)+)""#).unwrap());

/// Rebuild a lesson-shaped value from unparseable text.
///
/// Fails only when neither a title nor a level anchor can be located; with
/// both anchors present it always produces a structurally complete object,
/// however sparse.
pub fn reconstruct(text: &str) -> Result<Value, ReconstructError> {
    let title = anchor_value(&TITLE_ANCHOR, text);
    let level = anchor_value(&LEVEL_ANCHOR, text);
    let (title, level) = match (title, level) {
        (Some(t), Some(l)) => (t, l),
        _ => return Err(ReconstructError::MissingAnchors),
    };

    let objectives: Vec<Value> = field_span(text, "objectives", '[')
        .map(|span| {
            QUOTED
                .captures_iter(span)
                .map(|cap| Value::String(unescape(&cap[1])))
                .collect()
        })
        .unwrap_or_default();

    let grammar = salvage_objects(text, "grammar", |chunk| {
        let title = anchor_value(&TITLE_ANCHOR, chunk)
            .unwrap_or_else(|| "Recovered section".to_string());
        json!({ "title": title })
    });

    let examples = salvage_objects(text, "examples", |chunk| {
        let title = anchor_value(&TITLE_ANCHOR, chunk)
            .unwrap_or_else(|| "Recovered examples".to_string());
        json!({ "title": title, "items": [] })
    });

    let exercises = field_span(text, "exercises", '{')
        .and_then(|span| parse_strict(span).ok())
        .filter(Value::is_object)
        .unwrap_or_else(|| json!({}));

    Ok(json!({
        "title": title,
        "level": level,
        "objectives": objectives,
        "prerequisites": [],
        "grammar": grammar,
        "examples": examples,
        "exercises": exercises,
        "reconstructed": true,
    }))
}

fn anchor_value(anchor: &Regex, text: &str) -> Option<String> {
    anchor.captures(text).map(|cap| unescape(&cap[1]))
}

fn unescape(raw: &str) -> String {
    // The anchor regexes capture string bodies that may carry JSON escapes.
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string())
}

/// Collect the top-level `{...}` chunks of a named array field, keeping
/// each chunk that strict-parses and substituting a placeholder for each
/// that does not.
fn salvage_objects<F>(text: &str, field: &str, placeholder: F) -> Vec<Value>
where
    F: Fn(&str) -> Value,
{
    let span = match field_span(text, field, '[') {
        Some(span) => span,
        None => return Vec::new(),
    };
    object_chunks(span)
        .into_iter()
        .map(|chunk| match parse_strict(chunk) {
            Ok(Value::Object(obj)) => Value::Object(obj),
            _ => placeholder(chunk),
        })
        .collect()
}

/// Locate `"<name>": <open>...` and return the balanced span including the
/// delimiters. The quotes around the field name are optional so prose-ish
/// output still matches.
fn field_span<'a>(text: &'a str, name: &str, open: char) -> Option<&'a str> {
    let pattern = format!(
        r#"(?i)"?\b{}\b"?\s*[:=]\s*\{}"#,
        regex::escape(name),
        if open == '{' { "{" } else { "[" }
    );
    let re = Regex::new(&pattern).ok()?;
    let m = re.find(text)?;
    let start = m.end() - 1;
    balanced_span(text, start)
}

/// Scan a balanced bracket/brace span starting at `open_idx`, honoring
/// strings and escapes. Returns the span including both delimiters, or the
/// remainder of the text when the closer is missing (truncated output).
fn balanced_span(text: &str, open_idx: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    let open = *bytes.get(open_idx)?;
    let close = match open {
        b'{' => b'}',
        b'[' => b']',
        _ => return None,
    };
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(open_idx) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            _ if b == open => depth += 1,
            _ if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open_idx..=i]);
                }
            }
            _ => {}
        }
    }
    Some(&text[open_idx..])
}

/// Top-level `{...}` chunks inside an array span. A final chunk whose
/// closing brace was cut off is still returned (it will fail the strict
/// parse and become a placeholder).
fn object_chunks(span: &str) -> Vec<&str> {
    let bytes = span.as_bytes();
    let mut chunks = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            match balanced_span(span, i) {
                Some(chunk) => {
                    i += chunk.len();
                    chunks.push(chunk);
                }
                None => break,
            }
        } else {
            i += 1;
        }
    }
    chunks
}

/// Quick check used by callers that want to know whether reconstruction
/// even has anchors to work with.
pub fn has_anchors(text: &str) -> bool {
    TITLE_ANCHOR.is_match(text) && LEVEL_ANCHOR.is_match(text)
}
