//! Provider/model fallback orchestration.
//!
//! Walks an ordered candidate list, invoking each provider/model pair at
//! most once and classifying each failure. The first raw response wins and
//! halts the walk; what comes back is text plus provenance, never parsed
//! content. Parse trouble downstream is a recovery concern and never
//! causes re-selection here.

use std::time::Instant;

use crate::config::GenConfig;
use crate::error::{
    ExhaustionKind, FailureClassification, GenerationError, ProviderError,
};
use crate::events::{emit, Event};
use crate::gen_ctx::{Candidate, GenCtx};
use crate::provider::{classify, ModelRequest};

/// A raw model response with the provenance of the candidate that
/// produced it.
#[derive(Debug)]
pub struct RawModelResponse {
    pub text: String,
    pub provider: &'static str,
    pub model: String,
    pub elapsed_ms: u64,
}

/// One failed attempt, kept for the exhaustion report.
struct AttemptRecord {
    provider: &'static str,
    model: String,
    classification: FailureClassification,
}

/// Invoke candidates in order until one returns a response.
///
/// Each candidate is tried at most once. A missing-credentials failure
/// aborts the whole walk immediately: it is a configuration problem, not
/// a provider outage, and trying further candidates would mask it. When
/// every candidate fails, the error reports whether the exhaustion was
/// uniformly rate limiting, uniformly unavailable models, or mixed,
/// together with a per-candidate summary.
pub async fn invoke_with_fallback(
    ctx: &GenCtx,
    candidates: &[Candidate],
    system: Option<&str>,
    prompt: &str,
    config: &GenConfig,
) -> Result<RawModelResponse, GenerationError> {
    if candidates.is_empty() {
        return Err(GenerationError::NoCredentials(
            "no provider candidates configured".into(),
        ));
    }

    let mut attempts: Vec<AttemptRecord> = Vec::new();

    for (index, candidate) in candidates.iter().enumerate() {
        let provider = candidate.provider.name();
        emit(
            &ctx.event_handler,
            Event::CandidateAttempt {
                provider,
                model: candidate.model.clone(),
                attempt: index as u32 + 1,
            },
        );

        let request = ModelRequest {
            model: candidate.model.clone(),
            system: system.map(str::to_string),
            prompt: prompt.to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            json_mode: config.json_mode,
        };

        let started = Instant::now();
        match candidate.provider.complete(&ctx.client, &request).await {
            Ok(text) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                emit(
                    &ctx.event_handler,
                    Event::ModelResponded {
                        provider,
                        model: candidate.model.clone(),
                        elapsed_ms,
                    },
                );
                return Ok(RawModelResponse {
                    text,
                    provider,
                    model: candidate.model.clone(),
                    elapsed_ms,
                });
            }
            Err(ProviderError::MissingCredentials { provider }) => {
                return Err(GenerationError::NoCredentials(format!(
                    "provider {} has no credentials configured",
                    provider
                )));
            }
            Err(error) => {
                let classification = classify(&error);
                emit(
                    &ctx.event_handler,
                    Event::CandidateFailed {
                        provider,
                        model: candidate.model.clone(),
                        classification,
                    },
                );
                attempts.push(AttemptRecord {
                    provider,
                    model: candidate.model.clone(),
                    classification,
                });
                if index + 1 < candidates.len() {
                    let delay = ctx.pace_delay();
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    Err(exhaustion_error(&attempts))
}

fn exhaustion_error(attempts: &[AttemptRecord]) -> GenerationError {
    let kind = if attempts
        .iter()
        .all(|a| a.classification == FailureClassification::RateLimited)
    {
        ExhaustionKind::AllRateLimited
    } else if attempts
        .iter()
        .all(|a| a.classification == FailureClassification::ModelUnavailable)
    {
        ExhaustionKind::AllUnavailable
    } else {
        ExhaustionKind::Mixed
    };

    let detail = attempts
        .iter()
        .map(|a| format!("{}/{}: {}", a.provider, a.model, a.classification))
        .collect::<Vec<_>>()
        .join("; ");

    GenerationError::AllProvidersExhausted { kind, detail }
}
