//! The lesson generation pipeline.
//!
//! One parameterized flow serves generation, exercise regeneration, and
//! sentence grading; they differ only in prompt, acceptance type, and how
//! far down the escalation ladder they are allowed to go. For the main
//! flow the ladder is: local recovery (sanitize, repair, strict parse),
//! then one model-assisted repair call, then fragment reconstruction of
//! the sanitized original text, and finally one completion call if the
//! resulting lesson is structurally incomplete. Parse failures never
//! re-enter provider fallback: once a candidate has answered, its text is
//! the text we work with.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::config::Preferences;
use crate::error::{GenerationError, Result};
use crate::events::{emit, Event};
use crate::gen_ctx::{Candidate, GenCtx};
use crate::lesson::{Exercises, GradeResult, Lesson, Provenance};
use crate::orchestrator::{invoke_with_fallback, RawModelResponse};
use crate::prompt::{
    build_exercises_prompt, build_grading_prompt, build_lesson_prompt, LESSON_SYSTEM,
};
use crate::recover::{recover_value, reconstruct, sanitize};
use crate::requester::{complete_lesson, repair_json};
use crate::video::lookup_video;

/// Generate a complete lesson for a topic.
///
/// `prefs` can pin a model (moved to the front of the fallback order) and
/// override sampling settings for this request only. The topic is taken
/// as given; an empty topic yields whatever the model makes of an empty
/// subject line.
///
/// The companion video lookup runs concurrently with generation and can
/// only ever add to the result, never fail it.
pub async fn generate_lesson(ctx: &GenCtx, topic: &str, prefs: &Preferences) -> Result<Lesson> {
    emit(
        &ctx.event_handler,
        Event::GenerationStart {
            topic: topic.to_string(),
        },
    );

    let video_future = async {
        match &ctx.video {
            Some(lookup) => lookup_video(&ctx.client, lookup, topic).await,
            None => None,
        }
    };

    let (result, video) = tokio::join!(generate_lesson_inner(ctx, topic, prefs), video_future);

    let result = result.map(|mut lesson| {
        if ctx.video.is_some() {
            emit(
                &ctx.event_handler,
                Event::VideoAttached {
                    found: video.is_some(),
                },
            );
        }
        lesson.video = video;
        lesson
    });

    emit(
        &ctx.event_handler,
        Event::GenerationEnd {
            ok: result.is_ok(),
        },
    );
    result
}

async fn generate_lesson_inner(ctx: &GenCtx, topic: &str, prefs: &Preferences) -> Result<Lesson> {
    let config = prefs.apply(&ctx.config);
    let candidates = ordered_candidates(ctx, prefs);
    let sub_candidates = with_extras(ctx, &candidates);

    let prompt = build_lesson_prompt(topic);
    let response =
        invoke_with_fallback(ctx, &candidates, Some(LESSON_SYSTEM), &prompt, &config).await?;
    let provenance = Provenance {
        provider: response.provider.to_string(),
        model: response.model.clone(),
        elapsed_ms: response.elapsed_ms,
    };

    let (value, repaired, reconstructed) = recover_response(ctx, &sub_candidates, &response).await?;
    emit(
        &ctx.event_handler,
        Event::RecoveryApplied {
            repaired,
            reconstructed,
        },
    );

    let mut lesson = deserialize_lesson(value, reconstructed, &response)?;

    if !lesson.is_complete() {
        if let Some(completed) = complete_lesson(ctx, &sub_candidates, &lesson).await {
            lesson = completed;
        }
    }

    lesson.created_at = Some(epoch_ms());
    lesson.provenance = Some(provenance);
    Ok(lesson)
}

/// Run the escalation ladder on a raw response: local recovery, one
/// model-assisted repair, then reconstruction of the sanitized original.
async fn recover_response(
    ctx: &GenCtx,
    sub_candidates: &[Candidate],
    response: &RawModelResponse,
) -> Result<(Value, bool, bool)> {
    match recover_value(&response.text) {
        Ok(recovery) => Ok((recovery.value, recovery.repaired, false)),
        Err(_) => match repair_json(ctx, sub_candidates, &response.text).await {
            Ok(recovery) => Ok((recovery.value, true, false)),
            Err(_) => reconstruct_response(response).map(|value| (value, true, true)),
        },
    }
}

/// Reconstruct from the sanitized original response text. The repair
/// model's failed answer is discarded; the original is the better source.
fn reconstruct_response(response: &RawModelResponse) -> Result<Value> {
    reconstruct(&sanitize(&response.text).text).map_err(|_| {
        GenerationError::UnrecoverableParseFailure(format!(
            "response from {}/{} had no recognizable lesson content",
            response.provider, response.model
        ))
    })
}

/// Turn a recovered value into a [`Lesson`].
///
/// Strict deserialization is tried first; when a wrongly typed leaf
/// rejects it, [`Lesson::from_object`] degrades the bad parts instead of
/// failing the request, and the completeness check downstream decides
/// whether a completion round refills them. Only a value that is not a
/// JSON object at all falls back to reconstruction.
fn deserialize_lesson(
    value: Value,
    already_reconstructed: bool,
    response: &RawModelResponse,
) -> Result<Lesson> {
    if let Ok(lesson) = serde_json::from_value::<Lesson>(value.clone()) {
        return Ok(lesson);
    }
    if let Some(lesson) = Lesson::from_object(&value) {
        return Ok(lesson);
    }
    if already_reconstructed {
        return Err(GenerationError::UnrecoverableParseFailure(
            "reconstructed value was not a JSON object".into(),
        ));
    }
    let value = reconstruct_response(response)?;
    Lesson::from_object(&value).ok_or_else(|| {
        GenerationError::UnrecoverableParseFailure(
            "reconstructed value was not a JSON object".into(),
        )
    })
}

/// Regenerate the exercise block for an existing lesson.
///
/// Accepts both response shapes models produce (bare categories, or the
/// block nested under an `"exercises"` key) and tolerates any subset of
/// broken items; only a response with no object at all is an error.
pub async fn regenerate_exercises(ctx: &GenCtx, lesson: &Lesson) -> Result<Exercises> {
    let sub_candidates = with_extras(ctx, &ctx.candidates);
    let prompt = build_exercises_prompt(&lesson.title, &lesson.grammar);
    let response =
        invoke_with_fallback(ctx, &ctx.candidates, Some(LESSON_SYSTEM), &prompt, &ctx.config)
            .await?;

    let value = match recover_value(&response.text) {
        Ok(recovery) => recovery.value,
        Err(_) => repair_json(ctx, &sub_candidates, &response.text).await?.value,
    };

    Exercises::normalize(&value).ok_or_else(|| {
        GenerationError::UnrecoverableParseFailure(
            "exercises response was not a JSON object".into(),
        )
    })
}

/// Grade a learner-written sentence against a lesson's grammar content.
///
/// A single model call with local recovery only -- grading is cheap to
/// retry from the caller's side, so no model-assisted escalation here.
pub async fn grade_sentence(ctx: &GenCtx, lesson: &Lesson, sentence: &str) -> Result<GradeResult> {
    let prompt = build_grading_prompt(lesson, sentence);
    let response =
        invoke_with_fallback(ctx, &ctx.candidates, Some(LESSON_SYSTEM), &prompt, &ctx.config)
            .await?;
    let recovery = recover_value(&response.text)
        .map_err(|err| GenerationError::UnrecoverableParseFailure(err.to_string()))?;
    serde_json::from_value(recovery.value)
        .map_err(|err| GenerationError::UnrecoverableParseFailure(err.to_string()))
}

/// The fallback order for one request: a preferred model moves to the
/// front, everything else keeps its configured order.
fn ordered_candidates(ctx: &GenCtx, prefs: &Preferences) -> Vec<Candidate> {
    let mut candidates = ctx.candidates.clone();
    if let Some(ref preferred) = prefs.model {
        candidates.sort_by_key(|c| c.model != *preferred);
    }
    candidates
}

fn with_extras(ctx: &GenCtx, primary: &[Candidate]) -> Vec<Candidate> {
    primary
        .iter()
        .cloned()
        .chain(ctx.extra_candidates.iter().cloned())
        .collect()
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExhaustionKind;
    use crate::events::{Event, FnEventHandler};
    use crate::provider::MockProvider;
    use std::sync::{Arc, Mutex};

    fn full_lesson_json() -> String {
        r#"{
            "title": "Present Perfect",
            "level": "B1/Pre-Intermediate",
            "objectives": ["use have/has + V3"],
            "prerequisites": [],
            "grammar": [{"title": "Form", "summary": "have/has + V3", "points": ["irregular participles"]}],
            "examples": [{"title": "Experience", "items": [{"en": "I have been to Hue.", "vi": "", "explain": ""}]}],
            "exercises": {"recognition": [{"id": "r1", "prompt": "Pick one", "choices": ["a", "b"], "answer": 0, "explain": ""}]}
        }"#
        .to_string()
    }

    fn ctx_with(provider: Arc<MockProvider>, model: &str) -> GenCtx {
        GenCtx::builder()
            .candidate(Candidate::new(provider, model))
            .build()
    }

    #[tokio::test]
    async fn clean_response_is_one_call_and_complete() {
        let mock = Arc::new(MockProvider::replying("mock", full_lesson_json()));
        let ctx = ctx_with(mock.clone(), "m1");

        let lesson = generate_lesson(&ctx, "present perfect", &Preferences::default())
            .await
            .unwrap();

        assert_eq!(mock.call_count(), 1);
        assert!(lesson.is_complete());
        assert!(!lesson.reconstructed);
        assert!(lesson.created_at.is_some());
        let provenance = lesson.provenance.unwrap();
        assert_eq!(provenance.provider, "mock");
        assert_eq!(provenance.model, "m1");
    }

    #[tokio::test]
    async fn quoted_answer_index_is_delivered_in_one_call() {
        let with_quoted_index =
            full_lesson_json().replace(r#""answer": 0"#, r#""answer": "0""#);
        let mock = Arc::new(MockProvider::replying("mock", with_quoted_index));
        let ctx = ctx_with(mock.clone(), "m1");

        let lesson = generate_lesson(&ctx, "present perfect", &Preferences::default())
            .await
            .unwrap();

        // No repair or completion call for a merely quoted index.
        assert_eq!(mock.call_count(), 1);
        assert!(lesson.is_complete());
        assert_eq!(lesson.exercises.recognition[0].answer, 0);
    }

    #[tokio::test]
    async fn wrongly_typed_section_degrades_then_completes() {
        // objectives as a bare string: the strict pass rejects the whole
        // document, the lenient pass drops the field, and the completion
        // call refills it. Never a terminal parse failure.
        let broken = full_lesson_json().replace(
            r#""objectives": ["use have/has + V3"]"#,
            r#""objectives": "use have/has + V3""#,
        );
        let mock = Arc::new(
            MockProvider::new("mock")
                .with_reply(broken)
                .with_reply(full_lesson_json()),
        );
        let ctx = ctx_with(mock.clone(), "m1");

        let lesson = generate_lesson(&ctx, "present perfect", &Preferences::default())
            .await
            .unwrap();

        // Main call + completion call, no repair round.
        assert_eq!(mock.call_count(), 2);
        assert!(lesson.is_complete());
        assert!(!lesson.reconstructed);
    }

    #[tokio::test]
    async fn recoverable_malformed_response_needs_no_sub_calls() {
        // Missing separator between grammar objects plus a trailing comma.
        let broken = full_lesson_json()
            .replace(
                r#""points": ["irregular participles"]}"#,
                r#""points": ["irregular participles"]}{"title": "Use"}"#,
            )
            .replace(
                r#""objectives": ["use have/has + V3"]"#,
                r#""objectives": ["use have/has + V3",]"#,
            );
        let mock = Arc::new(MockProvider::replying("mock", broken));
        let ctx = ctx_with(mock.clone(), "m1");

        let lesson = generate_lesson(&ctx, "present perfect", &Preferences::default())
            .await
            .unwrap();

        assert_eq!(mock.call_count(), 1);
        assert_eq!(lesson.grammar.len(), 2);
        assert!(!lesson.reconstructed);
    }

    #[tokio::test]
    async fn garbage_with_anchors_reconstructs_then_completes_once() {
        let garbage = r#"I think "title": "Modals" and "level": "B2/Intermediate" would {{{ work"#;
        let mock = Arc::new(
            MockProvider::new("mock")
                .with_reply(garbage)
                // Model-assisted repair also fails to produce JSON.
                .with_reply("still not json {")
                // Completion call returns a full lesson.
                .with_reply(full_lesson_json()),
        );
        let ctx = ctx_with(mock.clone(), "m1");

        let lesson = generate_lesson(&ctx, "modals", &Preferences::default())
            .await
            .unwrap();

        // Main call + repair call + completion call, nothing more.
        assert_eq!(mock.call_count(), 3);
        assert!(lesson.is_complete());
        assert!(lesson.reconstructed, "reconstruction marker must survive completion");
    }

    #[tokio::test]
    async fn garbage_without_anchors_is_unrecoverable() {
        let mock = Arc::new(
            MockProvider::new("mock")
                .with_reply("no lesson here at all {")
                .with_reply("repair also fails {"),
        );
        let ctx = ctx_with(mock.clone(), "m1");

        let err = generate_lesson(&ctx, "modals", &Preferences::default())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::UnrecoverableParseFailure(_)));
        // Exactly one repair attempt, no completion attempt.
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn all_rate_limited_surfaces_uniform_exhaustion() {
        let mock = Arc::new(
            MockProvider::new("mock")
                .with_failure(429, "limit")
                .with_failure(429, "limit"),
        );
        let ctx = GenCtx::builder()
            .candidate(Candidate::new(mock.clone(), "m1"))
            .candidate(Candidate::new(mock.clone(), "m2"))
            .build();

        let err = generate_lesson(&ctx, "modals", &Preferences::default())
            .await
            .unwrap_err();

        match err {
            GenerationError::AllProvidersExhausted { kind, .. } => {
                assert_eq!(kind, ExhaustionKind::AllRateLimited)
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn preferred_model_moves_to_front() {
        let mock = Arc::new(MockProvider::replying("mock", full_lesson_json()));
        let ctx = GenCtx::builder()
            .candidate(Candidate::new(mock.clone(), "m1"))
            .candidate(Candidate::new(mock.clone(), "m2"))
            .build();

        let prefs = Preferences {
            model: Some("m2".into()),
            ..Default::default()
        };
        let lesson = generate_lesson(&ctx, "modals", &prefs).await.unwrap();

        assert_eq!(lesson.provenance.unwrap().model, "m2");
        assert_eq!(mock.calls()[0].model, "m2");
    }

    #[tokio::test]
    async fn provenance_stays_per_request_under_concurrency() {
        let first = Arc::new(MockProvider::replying("alpha", full_lesson_json()));
        let second = Arc::new(MockProvider::replying("beta", full_lesson_json()));
        let ctx_a = ctx_with(first, "model-a");
        let ctx_b = ctx_with(second, "model-b");

        let prefs = Preferences::default();
        let (lesson_a, lesson_b) = tokio::join!(
            generate_lesson(&ctx_a, "past simple", &prefs),
            generate_lesson(&ctx_b, "conditionals", &prefs),
        );

        let provenance_a = lesson_a.unwrap().provenance.unwrap();
        let provenance_b = lesson_b.unwrap().provenance.unwrap();
        assert_eq!(provenance_a.provider, "alpha");
        assert_eq!(provenance_a.model, "model-a");
        assert_eq!(provenance_b.provider, "beta");
        assert_eq!(provenance_b.model, "model-b");
    }

    #[tokio::test]
    async fn extra_candidates_serve_sub_calls() {
        let primary = Arc::new(
            MockProvider::new("primary")
                .with_reply("garbage \"title\": \"T\" \"level\": \"B1\" {")
                // Primary is consulted first for the repair call and fails.
                .with_failure(503, "down"),
        );
        let extra = Arc::new(MockProvider::replying("extra", full_lesson_json()));
        let ctx = GenCtx::builder()
            .candidate(Candidate::new(primary.clone(), "big"))
            .extra_candidate(Candidate::new(extra.clone(), "small"))
            .build();

        let lesson = generate_lesson(&ctx, "articles", &Preferences::default())
            .await
            .unwrap();

        assert_eq!(primary.call_count(), 2);
        assert_eq!(extra.call_count(), 1);
        assert!(lesson.is_complete());
    }

    #[tokio::test]
    async fn events_trace_the_run() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let handler = Arc::new(FnEventHandler(move |event: Event| {
            seen_clone.lock().unwrap().push(format!("{event:?}"));
        }));

        let mock = Arc::new(MockProvider::replying("mock", full_lesson_json()));
        let ctx = GenCtx::builder()
            .candidate(Candidate::new(mock, "m1"))
            .event_handler(handler)
            .build();

        generate_lesson(&ctx, "gerunds", &Preferences::default())
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert!(seen.iter().any(|e| e.contains("GenerationStart")));
        assert!(seen.iter().any(|e| e.contains("CandidateAttempt")));
        assert!(seen.iter().any(|e| e.contains("ModelResponded")));
        assert!(seen.iter().any(|e| e.contains("RecoveryApplied")));
        assert!(seen.iter().any(|e| e.contains("GenerationEnd")));
    }

    #[tokio::test]
    async fn regenerate_exercises_accepts_nested_and_bare_shapes() {
        let lesson = Lesson {
            title: "Past Simple".into(),
            grammar: vec![Default::default()],
            ..Default::default()
        };

        let bare = r#"{"recognition": [{"id": "r1", "prompt": "?", "choices": ["a"], "answer": 0, "explain": ""}]}"#;
        let mock = Arc::new(MockProvider::replying("mock", bare));
        let ctx = ctx_with(mock, "m1");
        let exercises = regenerate_exercises(&ctx, &lesson).await.unwrap();
        assert_eq!(exercises.recognition.len(), 1);

        let nested = format!(r#"{{"exercises": {bare}}}"#);
        let mock = Arc::new(MockProvider::replying("mock", nested));
        let ctx = ctx_with(mock, "m1");
        let exercises = regenerate_exercises(&ctx, &lesson).await.unwrap();
        assert_eq!(exercises.recognition.len(), 1);
    }

    #[tokio::test]
    async fn regenerate_exercises_rejects_non_objects() {
        let mock = Arc::new(
            MockProvider::new("mock")
                .with_reply("[1, 2, 3]")
                // The repair sub-call answers with the same non-object.
                .with_reply("[1, 2, 3]"),
        );
        let ctx = ctx_with(mock, "m1");
        let lesson = Lesson::default();
        let err = regenerate_exercises(&ctx, &lesson).await.unwrap_err();
        assert!(matches!(err, GenerationError::UnrecoverableParseFailure(_)));
    }

    #[tokio::test]
    async fn grade_sentence_parses_the_verdict() {
        let mock = Arc::new(MockProvider::replying(
            "mock",
            r#"{"ok": false, "feedback": "wrong participle", "corrections": ["I have eaten breakfast."]}"#,
        ));
        let ctx = ctx_with(mock.clone(), "m1");
        let lesson = Lesson {
            title: "Present Perfect".into(),
            ..Default::default()
        };

        let verdict = grade_sentence(&ctx, &lesson, "I have eat breakfast.").await.unwrap();
        assert!(!verdict.ok);
        assert_eq!(verdict.corrections.len(), 1);
        // Single call, no escalation.
        assert_eq!(mock.call_count(), 1);
    }
}
