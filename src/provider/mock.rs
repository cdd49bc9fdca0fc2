//! Mock provider for testing without a live endpoint.
//!
//! Plays back a script of outcomes in order and records every call it
//! receives, so tests can assert both what the pipeline sent and how many
//! candidates were tried. Share one instance across candidates via
//! `Arc<MockProvider>` to observe a whole fallback sequence.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;

use super::{ModelRequest, Provider};
use crate::error::ProviderError;

/// One scripted outcome for a [`MockProvider`] call.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Return this text as the raw model response.
    Reply(String),
    /// Fail with an HTTP-style error.
    Fail { status: u16, body: String },
}

/// A call the mock received, for assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub prompt: String,
}

/// Scripted provider. Outcomes are consumed in order; once the script is
/// exhausted, further calls fail with a 500 so over-calls show up as test
/// failures rather than silent repeats.
pub struct MockProvider {
    name: &'static str,
    script: Mutex<VecDeque<MockOutcome>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Shorthand for a mock that replies once with the given text.
    pub fn replying(name: &'static str, text: impl Into<String>) -> Self {
        Self::new(name).with_reply(text)
    }

    /// Shorthand for a mock that fails once with the given status.
    pub fn failing(name: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self::new(name).with_failure(status, body)
    }

    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(MockOutcome::Reply(text.into()));
        self
    }

    pub fn with_failure(self, status: u16, body: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(MockOutcome::Fail {
            status,
            body: body.into(),
        });
        self
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Snapshot of the calls received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        _client: &Client,
        request: &ModelRequest,
    ) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(RecordedCall {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
        });
        let outcome = self.script.lock().unwrap().pop_front();
        match outcome {
            Some(MockOutcome::Reply(text)) => Ok(text),
            Some(MockOutcome::Fail { status, body }) => Err(ProviderError::Http { status, body }),
            None => Err(ProviderError::Http {
                status: 500,
                body: "mock script exhausted".into(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
