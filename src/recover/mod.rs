//! Defensive recovery of JSON from raw model output.
//!
//! Model responses arrive as free text that usually contains JSON and
//! often contains damage: markdown fences, prose framing, missing commas,
//! truncated tails. Recovery runs a fixed sequence -- sanitize, strict
//! parse, textual repair, strict parse again -- and reports how far it got.
//! Fragment reconstruction is a separate, heavier step that callers invoke
//! only after a model-assisted repair attempt has also failed.

pub mod parse;
pub mod reconstruct;
pub mod repair;
pub mod sanitize;

use serde_json::Value;
use thiserror::Error;

pub use parse::{parse_strict, ParseFailure};
pub use reconstruct::{has_anchors, reconstruct, ReconstructError};
pub use repair::repair;
pub use sanitize::{sanitize, Sanitized};

/// Why the sanitize/repair/parse sequence gave up.
#[derive(Debug, Error)]
pub enum RecoverError {
    #[error("response text is empty")]
    EmptyResponse,
    #[error("no JSON object found in response text")]
    NoJsonSpan,
    #[error("response did not parse even after repair: {0}")]
    Parse(ParseFailure),
}

/// A successfully recovered value plus how it was obtained.
#[derive(Debug)]
pub struct Recovery {
    pub value: Value,
    /// False when the sanitized text parsed on the first attempt.
    pub repaired: bool,
}

/// Sanitize then parse, falling back to textual repair on failure.
///
/// The strict parser decides success at every stage; the repair rules are
/// only consulted when the sanitized text does not already parse.
pub fn recover_value(raw: &str) -> Result<Recovery, RecoverError> {
    if raw.trim().is_empty() {
        return Err(RecoverError::EmptyResponse);
    }
    let sanitized = sanitize(raw);
    if !sanitized.span_found {
        return Err(RecoverError::NoJsonSpan);
    }

    match parse_strict(&sanitized.text) {
        Ok(value) => Ok(Recovery {
            value,
            repaired: false,
        }),
        Err(_) => {
            let repaired = repair(&sanitized.text);
            match parse_strict(&repaired) {
                Ok(value) => Ok(Recovery {
                    value,
                    repaired: true,
                }),
                Err(failure) => Err(RecoverError::Parse(failure)),
            }
        }
    }
}
