use std::fmt;
use thiserror::Error;

/// Classification of a failed upstream invocation.
///
/// Drives the fallback decision in the [`orchestrator`](crate::orchestrator):
/// every variant advances to the next candidate; only exhaustion of the
/// candidate list surfaces to the caller. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClassification {
    /// HTTP 429 -- the provider is throttling us.
    RateLimited,
    /// HTTP 404 or a "model not found"-shaped error body.
    ModelUnavailable,
    /// Timeouts, connection failures, 5xx, and anything unrecognized.
    TransientError,
    /// The response text could not be parsed even after repair.
    ParseError,
    /// A parsed object failed the completeness check.
    IncompleteObject,
}

impl fmt::Display for FailureClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RateLimited => "rate_limited",
            Self::ModelUnavailable => "model_unavailable",
            Self::TransientError => "transient_error",
            Self::ParseError => "parse_error",
            Self::IncompleteObject => "incomplete_object",
        };
        f.write_str(s)
    }
}

/// Why the candidate list was exhausted.
///
/// Distinguishes systemic throttling from misconfiguration so the caller
/// can show the right message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustionKind {
    /// Every candidate was rate limited.
    AllRateLimited,
    /// Every candidate's model was unavailable.
    AllUnavailable,
    /// A mix of rate limits, unavailable models, and transient failures.
    Mixed,
}

impl fmt::Display for ExhaustionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AllRateLimited => "all candidates rate limited",
            Self::AllUnavailable => "all candidate models unavailable",
            Self::Mixed => "all candidates failed",
        };
        f.write_str(s)
    }
}

/// Terminal errors crossing the crate boundary.
///
/// Transient upstream failures are absorbed inside the orchestrator; the
/// caller only ever sees one of these three kinds, each with a
/// human-readable cause naming the provider/model combinations that failed.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// No usable credentials or no candidates configured. Fatal, no retry.
    #[error("no usable model candidates: {0}")]
    NoCredentials(String),

    /// Every candidate in the fallback list failed.
    #[error("{kind}: {detail}")]
    AllProvidersExhausted {
        /// What flavor of exhaustion this was.
        kind: ExhaustionKind,
        /// Per-candidate summary, e.g. `"openai/gpt-4o-mini: rate_limited; ..."`.
        detail: String,
    },

    /// The response could not be recovered into a lesson object, even via
    /// fragment reconstruction (anchors absent).
    #[error("could not recover a lesson from the model output: {0}")]
    UnrecoverableParseFailure(String),
}

impl From<anyhow::Error> for GenerationError {
    fn from(err: anyhow::Error) -> Self {
        GenerationError::UnrecoverableParseFailure(err.to_string())
    }
}

/// Errors produced by a single provider invocation.
///
/// Consumed by [`classify`](crate::provider::classify) inside the
/// orchestrator; never surfaced to the caller directly.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Low-level transport failure (connection refused, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-success status.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code (e.g. 429, 404, 500).
        status: u16,
        /// Response body text, captured for error-shape sniffing.
        body: String,
    },

    /// The provider requires a credential that was not configured.
    #[error("missing credentials for provider '{provider}'")]
    MissingCredentials {
        /// Provider name.
        provider: &'static str,
    },

    /// The response body had an unexpected shape.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

pub type Result<T> = std::result::Result<T, GenerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_display_tags() {
        assert_eq!(FailureClassification::RateLimited.to_string(), "rate_limited");
        assert_eq!(
            FailureClassification::ModelUnavailable.to_string(),
            "model_unavailable"
        );
        assert_eq!(
            FailureClassification::TransientError.to_string(),
            "transient_error"
        );
    }

    #[test]
    fn exhausted_error_names_candidates() {
        let err = GenerationError::AllProvidersExhausted {
            kind: ExhaustionKind::AllRateLimited,
            detail: "openai/gpt-4o-mini: rate_limited".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("rate limited"));
        assert!(msg.contains("openai/gpt-4o-mini"));
    }

    #[test]
    fn provider_http_error_keeps_body() {
        let err = ProviderError::Http {
            status: 404,
            body: "model not found".into(),
        };
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("model not found"));
    }
}
