//! Provider for OpenAI-compatible APIs.
//!
//! Endpoint: `{base_url}/v1/chat/completions`. Covers OpenAI itself plus
//! the many servers that speak the same protocol (vLLM, llama.cpp server,
//! LM Studio, Together AI, Groq, Mistral, Ollama's `/v1/`).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{ModelRequest, Provider};
use crate::error::ProviderError;

/// Provider for any OpenAI-compatible API.
///
/// # Example
///
/// ```
/// use lessonforge::provider::OpenAiProvider;
///
/// let provider = OpenAiProvider::new("https://api.openai.com").with_api_key("sk-...");
/// ```
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    /// Optional API key. If set, sent as `Authorization: Bearer {key}`.
    api_key: Option<String>,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field(
                "api_key",
                &self.api_key.as_ref().map(|k| {
                    if k.len() > 6 {
                        format!("{}***", &k[..6])
                    } else {
                        "***".to_string()
                    }
                }),
            )
            .finish()
    }
}

impl OpenAiProvider {
    /// Create a provider without authentication (local compatible servers).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
        }
    }

    /// Set the API key for authentication.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Returns `true` if an API key has been configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
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
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if request.json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }
        body
    }

    fn build_http_request(&self, client: &Client, body: &Value) -> reqwest::RequestBuilder {
        let base = self.base_url.trim_end_matches('/');
        let url = format!("{}/v1/chat/completions", base);
        let mut req = client.post(url).json(body);
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }
        req
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        client: &Client,
        request: &ModelRequest,
    ) -> Result<String, ProviderError> {
        if self.api_key.is_none() {
            return Err(ProviderError::MissingCredentials { provider: "openai" });
        }

        let body = Self::build_body(request);
        let resp = self.build_http_request(client, &body).send().await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Http { status, body });
        }

        let json_resp: Value = resp.json().await?;
        json_resp
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::MalformedResponse("no choices[0].message.content in response".into())
            })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
