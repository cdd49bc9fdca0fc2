//! Generation context shared across pipeline calls.
//!
//! [`GenCtx`] carries the HTTP client, the ordered provider/model candidate
//! list, generation defaults, the optional video lookup endpoint, and the
//! optional event handler. It is constructed once and shared across
//! concurrent generations; everything request-scoped (provenance, attempt
//! records) lives on the stack of each call instead.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::config::GenConfig;
use crate::events::EventHandler;
use crate::provider::Provider;
use crate::video::VideoLookup;

/// One provider/model pair in the fallback order.
#[derive(Clone)]
pub struct Candidate {
    pub provider: Arc<dyn Provider>,
    pub model: String,
}

impl Candidate {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

impl std::fmt::Debug for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candidate")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .finish()
    }
}

/// Shared context for lesson generation.
///
/// # Example
///
/// ```no_run
/// use lessonforge::{Candidate, GenCtx};
/// use lessonforge::provider::OpenAiProvider;
/// use std::sync::Arc;
///
/// let openai = Arc::new(OpenAiProvider::new("https://api.openai.com").with_api_key("sk-..."));
/// let ctx = GenCtx::builder()
///     .candidate(Candidate::new(openai.clone(), "gpt-4o-mini"))
///     .candidate(Candidate::new(openai, "gpt-4o"))
///     .build();
/// ```
pub struct GenCtx {
    /// HTTP client (cheap to clone -- uses `Arc` internally).
    pub client: Client,
    /// Fallback order for the main generation call.
    pub candidates: Vec<Candidate>,
    /// Extra candidates appended for model-assisted repair/completion
    /// calls, typically a cheap local model.
    pub extra_candidates: Vec<Candidate>,
    /// Generation defaults; per-request preferences override these.
    pub config: GenConfig,
    /// Upper bound on the jittered pause between failed candidates.
    /// Zero (the default) means no pause.
    pub pacing: Duration,
    /// Optional video search endpoint queried alongside generation.
    pub video: Option<VideoLookup>,
    /// Optional event handler for lifecycle events.
    pub event_handler: Option<Arc<dyn EventHandler>>,
}

impl GenCtx {
    /// Create a new builder.
    pub fn builder() -> GenCtxBuilder {
        GenCtxBuilder {
            client: None,
            candidates: Vec::new(),
            extra_candidates: Vec::new(),
            config: GenConfig::default(),
            pacing: Duration::ZERO,
            video: None,
            event_handler: None,
            timeout: None,
        }
    }

    /// The jittered pause before moving to the next candidate. Full
    /// jitter: uniform in `[0, pacing]`.
    pub(crate) fn pace_delay(&self) -> Duration {
        if self.pacing.is_zero() {
            return Duration::ZERO;
        }
        let max_ms = self.pacing.as_millis() as u64;
        Duration::from_millis(fastrand::u64(0..=max_ms))
    }
}

impl std::fmt::Debug for GenCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenCtx")
            .field("candidates", &self.candidates)
            .field("extra_candidates", &self.extra_candidates)
            .field("config", &self.config)
            .field("pacing", &self.pacing)
            .field("has_video", &self.video.is_some())
            .field("has_event_handler", &self.event_handler.is_some())
            .finish()
    }
}

/// Builder for [`GenCtx`].
pub struct GenCtxBuilder {
    client: Option<Client>,
    candidates: Vec<Candidate>,
    extra_candidates: Vec<Candidate>,
    config: GenConfig,
    pacing: Duration,
    video: Option<VideoLookup>,
    event_handler: Option<Arc<dyn EventHandler>>,
    timeout: Option<Duration>,
}

impl GenCtxBuilder {
    /// Set the HTTP client. If not set, a default client is created.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Append one candidate to the fallback order.
    pub fn candidate(mut self, candidate: Candidate) -> Self {
        self.candidates.push(candidate);
        self
    }

    /// Set the whole fallback order at once.
    pub fn candidates(mut self, candidates: Vec<Candidate>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Append a candidate used only for repair/completion sub-calls.
    pub fn extra_candidate(mut self, candidate: Candidate) -> Self {
        self.extra_candidates.push(candidate);
        self
    }

    /// Set the generation defaults.
    pub fn config(mut self, config: GenConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the upper bound for the jittered pause between failed
    /// candidates. Default: zero (no pause).
    pub fn pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Set the video search endpoint.
    pub fn video(mut self, video: VideoLookup) -> Self {
        self.video = Some(video);
        self
    }

    /// Set the event handler.
    pub fn event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Set the request timeout for the default client. Default: 60 seconds.
    /// Ignored when a custom client is provided via `.client()`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the generation context.
    pub fn build(self) -> GenCtx {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(60));
        let client = self.client.unwrap_or_else(|| {
            Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client")
        });
        GenCtx {
            client,
            candidates: self.candidates,
            extra_candidates: self.extra_candidates,
            config: self.config,
            pacing: self.pacing,
            video: self.video,
            event_handler: self.event_handler,
        }
    }
}
