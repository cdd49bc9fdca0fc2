//! Response sanitizer -- the first pass over raw model output.
//!
//! Total and idempotent: never fails, and re-applying to its own output is
//! a no-op. Strips BOM and markdown fences, truncates to the outermost
//! brace span, and collapses one level of over-escaping when the text shows
//! the stringified-JSON signature.

/// Outcome of sanitization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    /// The cleaned text.
    pub text: String,
    /// Whether a `{`..`}` span was found. `false` is a distinct condition
    /// from parse failure -- no-brace text goes straight to reconstruction.
    pub span_found: bool,
}

/// Normalize a raw text blob before any parse attempt.
///
/// Steps, in order:
/// 1. Strip BOM and leading/trailing whitespace.
/// 2. Strip a leading and a trailing code fence (```` ```json ```` /
///    ```` ``` ````), if present at the text's edges.
/// 3. Truncate to the substring between the first `{` and the last `}`.
/// 4. Collapse over-escaping (`\"` → `"`, `\\` → `\`) when the span starts
///    with the `{\"` signature of double-encoded JSON.
///
/// If no brace pair exists, returns the (fence-stripped, trimmed) input
/// with `span_found == false`.
pub fn sanitize(input: &str) -> Sanitized {
    let text = input.trim_start_matches('\u{feff}').trim();
    let text = strip_fences(text);
    let trimmed = text.trim();

    match brace_span(trimmed) {
        Some((start, end)) => {
            let span = &trimmed[start..=end];
            let collapsed = if looks_over_escaped(span) {
                collapse_escapes(span)
            } else {
                span.to_string()
            };
            Sanitized {
                text: collapsed,
                span_found: true,
            }
        }
        None => Sanitized {
            text: trimmed.to_string(),
            span_found: false,
        },
    }
}

/// Remove a fence marker at the start and at the end of the text, if
/// present. Fences anywhere else are left alone: string content may
/// legitimately contain backticks, and prose-framed fences fall away with
/// the brace-span truncation anyway.
fn strip_fences(text: &str) -> String {
    let mut rest = text.trim();
    if let Some(after) = rest.strip_prefix("```") {
        // Drop a language hint directly after the fence (e.g. "json").
        let hint_len = after
            .char_indices()
            .take_while(|(_, c)| c.is_ascii_alphanumeric())
            .map(|(i, c)| i + c.len_utf8())
            .last()
            .unwrap_or(0);
        rest = after[hint_len..].trim_start();
    }
    if let Some(before) = rest.strip_suffix("```") {
        rest = before.trim_end();
    }
    rest.to_string()
}

/// Byte offsets of the first `{` and last `}`, if both exist in order.
fn brace_span(text: &str) -> Option<(usize, usize)> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end >= start).then_some((start, end))
}

/// Heuristic for double-encoded JSON: a brace immediately followed by an
/// escaped quote (`{\"`) is the classic stringified-object artifact.
fn looks_over_escaped(span: &str) -> bool {
    span.starts_with("{\\\"")
}

/// Collapse one escape level: `\"` → `"`, `\\` → `\`. Other escapes
/// (`\n`, `\t`, ...) are kept so string content survives a later strict parse.
fn collapse_escapes(span: &str) -> String {
    let mut result = String::with_capacity(span.len());
    let mut chars = span.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.peek() {
                Some('"') => {
                    result.push('"');
                    chars.next();
                }
                Some('\\') => {
                    result.push('\\');
                    chars.next();
                }
                _ => result.push(ch),
            }
        } else {
            result.push(ch);
        }
    }
    result
}
