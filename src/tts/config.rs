//! Speech synthesis configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Configuration for the text-to-speech client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsConfig {
    /// API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key sent as `xi-api-key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Synthesis model
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Output format query parameter
    #[serde(default = "default_output_format")]
    pub output_format: String,
    /// Text longer than this many characters is truncated before synthesis
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Voice id overrides keyed by persona key
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub voices: HashMap<String, String>,
    /// Request timeout in seconds (unset = HTTP client default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_endpoint() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_model_id() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_output_format() -> String {
    "mp3_44100_128".to_string()
}

fn default_max_chars() -> usize {
    5000
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self::base_default().with_env_overrides()
    }
}

impl TtsConfig {
    pub fn base_default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            model_id: default_model_id(),
            output_format: default_output_format(),
            max_chars: default_max_chars(),
            voices: HashMap::new(),
            timeout_secs: None,
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::base_default()
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Apply environment variable overrides.
    ///
    /// - `TTS_ENDPOINT`: API base URL
    /// - `TTS_API_KEY`, then `ELEVENLABS_API_KEY`: credential
    /// - `TTS_MODEL`: synthesis model
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("TTS_ENDPOINT") {
            self.endpoint = val;
        }
        if let Ok(val) = std::env::var("TTS_API_KEY") {
            self.api_key = Some(val);
        } else if self.api_key.is_none() {
            self.api_key = std::env::var("ELEVENLABS_API_KEY").ok();
        }
        if let Ok(val) = std::env::var("TTS_MODEL") {
            self.model_id = val;
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
}
