//! Provider trait and normalized request types.
//!
//! The [`Provider`] trait abstracts over LLM APIs, translating the
//! normalized [`ModelRequest`] into provider-specific HTTP calls. Built-in
//! implementations: [`OpenAiProvider`], [`OllamaProvider`], plus
//! [`MockProvider`] for tests.
//!
//! Providers return raw response text only; all JSON handling lives in the
//! recovery pipeline. Failures surface as [`ProviderError`] and are mapped
//! to a [`FailureClassification`] by [`classify`] so the fallback
//! orchestrator can decide what the exhaustion of a candidate list means.

pub mod mock;
pub mod ollama;
pub mod openai;

pub use mock::{MockOutcome, MockProvider};
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{FailureClassification, ProviderError};

/// A normalized completion request -- provider-agnostic.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// Model identifier (e.g. `"gpt-4o-mini"`, `"llama3.2:3b"`).
    pub model: String,

    /// Optional system prompt.
    pub system: Option<String>,

    /// The user prompt text.
    pub prompt: String,

    /// Sampling temperature.
    pub temperature: f64,

    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// Whether to request JSON-constrained output where the provider
    /// supports it.
    pub json_mode: bool,
}

/// Abstraction over LLM providers.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn Provider>`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Execute a completion call and return the raw response text.
    async fn complete(
        &self,
        client: &Client,
        request: &ModelRequest,
    ) -> Result<String, ProviderError>;

    /// Short provider name for events and diagnostics.
    fn name(&self) -> &'static str;
}

/// Map a provider failure to its fallback classification.
///
/// The HTTP status line is the indicator for rate limiting: any 429 is
/// [`FailureClassification::RateLimited`] regardless of body text. A model
/// the provider does not serve shows up either as a 404 or as an error
/// body naming the model, and anything else (timeouts, connection resets,
/// 5xx, unreadable responses) is transient.
pub fn classify(error: &ProviderError) -> FailureClassification {
    match error {
        ProviderError::Http { status: 429, .. } => FailureClassification::RateLimited,
        ProviderError::Http { status: 404, .. } => FailureClassification::ModelUnavailable,
        ProviderError::Http { body, .. } => {
            let lower = body.to_lowercase();
            if lower.contains("model") && (lower.contains("not found") || lower.contains("does not exist"))
            {
                FailureClassification::ModelUnavailable
            } else {
                FailureClassification::TransientError
            }
        }
        ProviderError::Request(_) | ProviderError::MalformedResponse(_) => {
            FailureClassification::TransientError
        }
        ProviderError::MissingCredentials { .. } => FailureClassification::TransientError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_429_is_rate_limited() {
        let err = ProviderError::Http {
            status: 429,
            body: "slow down".into(),
        };
        assert_eq!(classify(&err), FailureClassification::RateLimited);
    }

    #[test]
    fn classify_404_is_model_unavailable() {
        let err = ProviderError::Http {
            status: 404,
            body: String::new(),
        };
        assert_eq!(classify(&err), FailureClassification::ModelUnavailable);
    }

    #[test]
    fn classify_body_naming_missing_model() {
        let err = ProviderError::Http {
            status: 400,
            body: r#"{"error": {"message": "The model `gpt-9` does not exist"}}"#.into(),
        };
        assert_eq!(classify(&err), FailureClassification::ModelUnavailable);

        let err = ProviderError::Http {
            status: 500,
            body: "model llama9 not found, try pulling it first".into(),
        };
        assert_eq!(classify(&err), FailureClassification::ModelUnavailable);
    }

    #[test]
    fn classify_5xx_is_transient() {
        let err = ProviderError::Http {
            status: 503,
            body: "service unavailable".into(),
        };
        assert_eq!(classify(&err), FailureClassification::TransientError);
    }

    #[test]
    fn classify_malformed_response_is_transient() {
        let err = ProviderError::MalformedResponse("no choices in response".into());
        assert_eq!(classify(&err), FailureClassification::TransientError);
    }
}
