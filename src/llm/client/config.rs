//! LLM client configuration.

use serde::{Deserialize, Serialize};

use super::prompts::{DEFAULT_TAGS_PROMPT, DEFAULT_TITLE_PROMPT};

/// LLM provider type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI-compatible chat completions API (OpenAI, Groq, Together.ai, etc.)
    #[default]
    OpenAI,
    /// Ollama chat API (local, no credential)
    Ollama,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" | "groq" | "together" => Some(Self::OpenAI),
            _ => None,
        }
    }

    /// Whether requests must carry an API key.
    pub fn requires_credential(&self) -> bool {
        matches!(self, Self::OpenAI)
    }
}

/// Configuration for the chat-completion client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider (openai or ollama)
    #[serde(default)]
    pub provider: LlmProvider,
    /// API endpoint (provider-specific defaults apply)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key for OpenAI-compatible providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model used for every dialogue turn
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens in response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature for generation (0.0 - 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Request timeout in seconds (unset = HTTP client default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Custom prompt for title generation (uses {programme} and {transcript} placeholders)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_prompt: Option<String>,
    /// Custom prompt for tag generation (uses {programme} and {transcript} placeholders)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags_prompt: Option<String>,
}

fn default_endpoint() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    400
}

fn default_temperature() -> f32 {
    0.8
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::base_default().with_env_overrides()
    }
}

impl LlmConfig {
    /// Base default without env overrides (used internally to avoid recursion).
    pub fn base_default() -> Self {
        Self {
            provider: LlmProvider::default(),
            endpoint: default_endpoint(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: None,
            title_prompt: None,
            tags_prompt: None,
        }
    }

    /// Check if the config equals the default (for skip_serializing_if).
    pub fn is_default(&self) -> bool {
        *self == Self::base_default()
    }

    /// Whether the client can make requests with this configuration.
    pub fn is_configured(&self) -> bool {
        !self.provider.requires_credential()
            || self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `LLM_PROVIDER`: "openai" (default), "groq", "together" or "ollama"
    /// - `LLM_ENDPOINT`: API endpoint (defaults based on provider)
    /// - `LLM_API_KEY`: API key for OpenAI-compatible providers
    /// - `LLM_MODEL`: Model name
    /// - `LLM_MAX_TOKENS`: Maximum tokens in response
    /// - `LLM_TEMPERATURE`: Generation temperature
    ///
    /// Priority: LLM_PROVIDER wins over auto-detection from API keys.
    /// If LLM_PROVIDER=openai, uses OPENAI_API_KEY even if GROQ_API_KEY is set.
    pub fn with_env_overrides(mut self) -> Self {
        // Check if provider is explicitly set - this is authoritative
        let explicit_provider = std::env::var("LLM_PROVIDER").ok();
        if let Some(ref val) = explicit_provider {
            if let Some(provider) = LlmProvider::from_str(val) {
                self.provider = provider;
            }
        }

        // Explicit endpoint always wins
        let explicit_endpoint = std::env::var("LLM_ENDPOINT").ok();
        if let Some(ref endpoint) = explicit_endpoint {
            self.endpoint = endpoint.clone();
        }

        // Explicit API key always wins
        if let Ok(val) = std::env::var("LLM_API_KEY") {
            self.api_key = Some(val);
        }

        if let Some(ref provider_str) = explicit_provider {
            let provider_lower = provider_str.to_lowercase();

            if explicit_endpoint.is_none() {
                match provider_lower.as_str() {
                    "groq" => self.endpoint = "https://api.groq.com/openai".to_string(),
                    "openai" => self.endpoint = "https://api.openai.com".to_string(),
                    "together" => self.endpoint = "https://api.together.xyz".to_string(),
                    "ollama" => self.endpoint = "http://localhost:11434".to_string(),
                    _ => {}
                }
            }

            if self.api_key.is_none() {
                match provider_lower.as_str() {
                    "groq" => self.api_key = std::env::var("GROQ_API_KEY").ok(),
                    "openai" => self.api_key = std::env::var("OPENAI_API_KEY").ok(),
                    // together uses LLM_API_KEY which we already checked
                    _ => {}
                }
            }
        } else if self.api_key.is_none() {
            // No explicit provider - auto-detect from available keys
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                self.api_key = Some(key);
            } else if let Ok(key) = std::env::var("GROQ_API_KEY") {
                self.api_key = Some(key);
                if explicit_endpoint.is_none() {
                    self.endpoint = "https://api.groq.com/openai".to_string();
                }
            }
        }

        if let Ok(val) = std::env::var("LLM_MODEL") {
            self.model = val;
        }
        if let Ok(val) = std::env::var("LLM_MAX_TOKENS") {
            if let Ok(n) = val.parse() {
                self.max_tokens = n;
            }
        }
        if let Ok(val) = std::env::var("LLM_TEMPERATURE") {
            if let Ok(t) = val.parse() {
                self.temperature = t;
            }
        }
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: Option<&str>) -> Self {
        self.api_key = api_key.map(str::to_string);
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Get the title prompt, using custom or default.
    pub fn get_title_prompt(&self) -> &str {
        self.title_prompt.as_deref().unwrap_or(DEFAULT_TITLE_PROMPT)
    }

    /// Get the tags prompt, using custom or default.
    pub fn get_tags_prompt(&self) -> &str {
        self.tags_prompt.as_deref().unwrap_or(DEFAULT_TAGS_PROMPT)
    }
}
