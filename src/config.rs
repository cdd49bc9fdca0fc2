use serde::{Deserialize, Serialize};

/// Generation parameters for a model call.
#[derive(Debug, Clone)]
pub struct GenConfig {
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f64,

    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// Request JSON-format output from providers that support it.
    pub json_mode: bool,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            max_tokens: 4000,
            json_mode: true,
        }
    }
}

impl GenConfig {
    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = temp;
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }
}

/// Per-request caller preferences.
///
/// A preferred model moves the matching candidate to the front of the
/// fallback list; generation parameters override the context defaults.
/// All fields optional -- `Preferences::default()` means "use the
/// configured candidate order and parameters as-is".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    /// Preferred model identifier (e.g. `"gpt-4o-mini"`). Tried first.
    #[serde(default)]
    pub model: Option<String>,

    /// Override the default temperature.
    #[serde(default)]
    pub temperature: Option<f64>,

    /// Override the default max output tokens.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Preferences {
    /// Apply overrides on top of a base config.
    pub fn apply(&self, base: &GenConfig) -> GenConfig {
        let mut config = base.clone();
        if let Some(t) = self.temperature {
            config.temperature = t;
        }
        if let Some(m) = self.max_tokens {
            config.max_tokens = m;
        }
        config
    }
}
