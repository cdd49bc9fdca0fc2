//! Event system for generation lifecycle hooks.
//!
//! Provides an optional, non-intrusive way to observe a generation run:
//! which provider/model candidates were tried, how each one failed, what
//! the recovery pipeline had to do to the response text, and which
//! model-assisted follow-up calls were made. Users implement
//! [`EventHandler`] for logging or progress tracking.

use std::sync::Arc;

use crate::error::FailureClassification;

/// Events emitted during lesson generation.
#[derive(Debug, Clone)]
pub enum Event {
    /// A generation run has started.
    GenerationStart {
        /// The lesson topic being generated.
        topic: String,
    },
    /// A provider/model candidate is about to be invoked.
    CandidateAttempt {
        /// Provider name (e.g. `"openai"`, `"ollama"`).
        provider: &'static str,
        /// Model identifier.
        model: String,
        /// Position in the candidate list (1-indexed).
        attempt: u32,
    },
    /// A candidate failed and the orchestrator is moving on.
    CandidateFailed {
        /// Provider name.
        provider: &'static str,
        /// Model identifier.
        model: String,
        /// How the failure was classified.
        classification: FailureClassification,
    },
    /// A candidate produced a response.
    ModelResponded {
        /// Provider name.
        provider: &'static str,
        /// Model identifier.
        model: String,
        /// Wall-clock time for the call in milliseconds.
        elapsed_ms: u64,
    },
    /// The recovery pipeline finished on a response.
    RecoveryApplied {
        /// Whether textual repair rules were needed.
        repaired: bool,
        /// Whether fragment reconstruction was needed.
        reconstructed: bool,
    },
    /// A model-assisted JSON repair call is being made.
    RepairRequest,
    /// A model-assisted completion call is being made for a partial lesson.
    CompletionRequest,
    /// The video lookup finished.
    VideoAttached {
        /// Whether a video was found for the lesson title.
        found: bool,
    },
    /// A generation run has finished.
    GenerationEnd {
        /// Whether a lesson was produced.
        ok: bool,
    },
}

/// Handler for generation lifecycle events.
///
/// This is entirely optional -- generation works without an event handler.
///
/// # Example
///
/// ```
/// use lessonforge::events::{Event, EventHandler};
///
/// struct PrintHandler;
///
/// impl EventHandler for PrintHandler {
///     fn on_event(&self, event: Event) {
///         match event {
///             Event::CandidateAttempt { provider, model, .. } => {
///                 println!("[try] {}/{}", provider, model)
///             }
///             Event::GenerationEnd { ok } => println!("[done] ok={}", ok),
///             _ => {}
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    /// Called when the pipeline emits an event.
    fn on_event(&self, event: Event);
}

/// Emit an event if a handler is present. No-op otherwise.
pub(crate) fn emit(handler: &Option<Arc<dyn EventHandler>>, event: Event) {
    if let Some(ref h) = handler {
        h.on_event(event);
    }
}

/// An [`EventHandler`] backed by a closure.
///
/// # Example
///
/// ```
/// use lessonforge::events::{Event, FnEventHandler};
/// use std::sync::Arc;
///
/// let handler = Arc::new(FnEventHandler(|event: Event| {
///     if let Event::RepairRequest = event {
///         eprintln!("model-assisted repair requested");
///     }
/// }));
/// ```
pub struct FnEventHandler<F: Fn(Event) + Send + Sync>(pub F);

impl<F: Fn(Event) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}
