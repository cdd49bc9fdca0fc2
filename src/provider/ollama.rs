//! Provider for local Ollama servers.
//!
//! Endpoint: `{base_url}/api/chat` with `stream: false`. Needs no
//! credentials, which makes it the natural last candidate in a fallback
//! list when a local model is installed.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{ModelRequest, Provider};
use crate::error::ProviderError;

/// Provider for an Ollama server.
///
/// # Example
///
/// ```
/// use lessonforge::provider::OllamaProvider;
///
/// let provider = OllamaProvider::new("http://localhost:11434");
/// ```
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: String,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn build_body(request: &ModelRequest) -> Value {
        let mut messages = Vec::new();
        if let Some(ref sys) = request.system {
            if !sys.is_empty() {
                messages.push(json!({"role": "system", "content": sys}));
            }
        }
        messages.push(json!({"role": "user", "content": request.prompt}));

        let mut body = json!({
            "model": request.model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            },
        });
        if request.json_mode {
            body["format"] = json!("json");
        }
        body
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn complete(
        &self,
        client: &Client,
        request: &ModelRequest,
    ) -> Result<String, ProviderError> {
        let base = self.base_url.trim_end_matches('/');
        let url = format!("{}/api/chat", base);
        let body = Self::build_body(request);

        let resp = client.post(url).json(&body).send().await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Http { status, body });
        }

        let json_resp: Value = resp.json().await?;
        json_resp
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::MalformedResponse("no message.content in response".into())
            })
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}
