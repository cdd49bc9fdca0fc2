//! Model-assisted repair and completion calls.
//!
//! Two escalation paths the pipeline may take after its own recovery
//! machinery runs out: ask a model to fix JSON the textual repairer could
//! not, and ask a model to fill the gaps of a lesson that parsed but
//! failed the completeness check. The pipeline invokes each path at most
//! once per generation, so a misbehaving model cannot trigger an
//! unbounded ping-pong of follow-up calls.

use crate::error::GenerationError;
use crate::events::{emit, Event};
use crate::gen_ctx::{Candidate, GenCtx};
use crate::lesson::Lesson;
use crate::orchestrator::invoke_with_fallback;
use crate::prompt::{build_completion_prompt, build_repair_prompt};
use crate::recover::{recover_value, Recovery};

const FIXER_SYSTEM: &str = "You are a strict JSON formatter. You output a single \
valid JSON object and nothing else.";

/// Ask a model to fix JSON text, then run the result through the local
/// recovery sequence.
///
/// Any failure (no candidate answered, or the answer still does not
/// parse) is reported back so the caller can escalate to fragment
/// reconstruction.
pub async fn repair_json(
    ctx: &GenCtx,
    candidates: &[Candidate],
    raw: &str,
) -> Result<Recovery, GenerationError> {
    emit(&ctx.event_handler, Event::RepairRequest);
    let prompt = build_repair_prompt(raw);
    let response =
        invoke_with_fallback(ctx, candidates, Some(FIXER_SYSTEM), &prompt, &ctx.config).await?;
    recover_value(&response.text)
        .map_err(|err| GenerationError::UnrecoverableParseFailure(err.to_string()))
}

/// Ask a model to fill in a lesson's missing parts.
///
/// Returns the completed lesson only if the response parses and actually
/// passes the completeness check; on any failure the caller keeps the
/// partial lesson it already has.
pub async fn complete_lesson(
    ctx: &GenCtx,
    candidates: &[Candidate],
    partial: &Lesson,
) -> Option<Lesson> {
    emit(&ctx.event_handler, Event::CompletionRequest);
    let prompt = build_completion_prompt(partial);
    let response = invoke_with_fallback(ctx, candidates, Some(FIXER_SYSTEM), &prompt, &ctx.config)
        .await
        .ok()?;
    let recovery = recover_value(&response.text).ok()?;
    // Lenient conversion: a wrongly typed leaf in the reply degrades to a
    // default instead of throwing the whole completion away.
    let mut completed = Lesson::from_object(&recovery.value)?;
    if !completed.is_complete() {
        return None;
    }
    // The marker survives completion: placeholder content may remain.
    completed.reconstructed = completed.reconstructed || partial.reconstructed;
    Some(completed)
}
