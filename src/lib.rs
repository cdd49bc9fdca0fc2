//! Resilient LLM lesson generation.
//!
//! `lessonforge` turns a grammar topic into a structured English lesson by
//! way of an LLM, assuming from the start that the model's output will be
//! damaged. The crate is organized around that assumption:
//!
//! - [`provider`] -- the [`Provider`](provider::Provider) trait plus OpenAI,
//!   Ollama, and mock implementations. Providers return raw text only.
//! - [`orchestrator`] -- ordered provider/model fallback. Each candidate is
//!   tried at most once; failures are classified (rate limited, model
//!   unavailable, transient) and the exhaustion report says which.
//! - [`recover`] -- sanitizer, data-driven textual repairer, strict parser,
//!   and fragment reconstructor. Valid JSON always passes through
//!   untouched; garbage degrades stepwise instead of failing outright.
//! - [`requester`] -- the two model-assisted escalations (fix-this-JSON and
//!   fill-these-gaps), each capped at one call per generation.
//! - [`pipeline`] -- [`generate_lesson`], [`regenerate_exercises`], and
//!   [`grade_sentence`] wire the above together.
//!
//! # Example
//!
//! ```no_run
//! use lessonforge::{generate_lesson, Candidate, GenCtx, Preferences};
//! use lessonforge::provider::OpenAiProvider;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), lessonforge::GenerationError> {
//! let openai = Arc::new(
//!     OpenAiProvider::new("https://api.openai.com").with_api_key("sk-..."),
//! );
//! let ctx = GenCtx::builder()
//!     .candidate(Candidate::new(openai.clone(), "gpt-4o-mini"))
//!     .candidate(Candidate::new(openai, "gpt-4o"))
//!     .build();
//!
//! let lesson = generate_lesson(&ctx, "present perfect", &Preferences::default()).await?;
//! println!("{} ({})", lesson.title, lesson.level);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod gen_ctx;
pub mod lesson;
pub mod orchestrator;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod recover;
pub mod requester;
pub mod video;

pub use config::{GenConfig, Preferences};
pub use error::{
    ExhaustionKind, FailureClassification, GenerationError, ProviderError, Result,
};
pub use events::{Event, EventHandler, FnEventHandler};
pub use gen_ctx::{Candidate, GenCtx, GenCtxBuilder};
pub use lesson::{Exercises, GradeResult, Lesson, Provenance};
pub use orchestrator::{invoke_with_fallback, RawModelResponse};
pub use pipeline::{generate_lesson, grade_sentence, regenerate_exercises};
pub use video::{VideoLookup, VideoRef};
