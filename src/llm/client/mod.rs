//! Chat-completion client used to write each dialogue turn.
//!
//! Supports OpenAI-compatible APIs (OpenAI, Groq, Together.ai) and Ollama.
//! One request per call, no retries: a failed call fails the whole run.

mod config;
mod prompts;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use config::{LlmConfig, LlmProvider};
pub use prompts::{DEFAULT_TAGS_PROMPT, DEFAULT_TITLE_PROMPT};

/// Errors that can occur during LLM operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// No API key for a provider that needs one
    #[error("LLM API key is not configured (set LLM_API_KEY or OPENAI_API_KEY)")]
    MissingCredential,
    /// Failed to connect to LLM service
    #[error("Connection error: {0}")]
    Connection(String),
    /// API returned an error
    #[error("API error: {0}")]
    Api(String),
    /// Failed to parse response
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Something that turns prompts into text.
///
/// [`LlmClient`] is the production implementation; the dialogue generator
/// only depends on this trait.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply to `prompt`, optionally steered by a system prompt.
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String, LlmError>;

    /// Generate a short title from a fully rendered title prompt.
    async fn generate_title(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self.generate(prompt, None).await?;
        let title = clean_title(&response);
        if title.is_empty() {
            return Err(LlmError::Parse("Empty title response".to_string()));
        }
        Ok(title)
    }

    /// Generate topic tags from a fully rendered tags prompt.
    async fn generate_tags(&self, prompt: &str) -> Result<Vec<String>, LlmError> {
        let response = self.generate(prompt, None).await?;
        let tags = parse_tags(&response);
        if tags.is_empty() {
            return Err(LlmError::Parse("No tags parsed from response".to_string()));
        }
        Ok(tags)
    }
}

/// HTTP client for the configured chat-completion provider.
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// OpenAI chat completions request format.
#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

/// OpenAI chat completions response format.
#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Ollama chat API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama chat API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: Option<ReplyMessage>,
}

impl LlmClient {
    /// Create a new LLM client with the given configuration.
    pub fn new(config: LlmConfig) -> Self {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder.build().unwrap_or_else(|_| Client::new());

        Self { config, client }
    }

    /// Get the config.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn messages<'a>(prompt: &'a str, system_prompt: Option<&'a str>) -> Vec<ChatMessage<'a>> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });
        messages
    }

    /// Call an OpenAI-compatible chat completions endpoint.
    async fn call_openai(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String, LlmError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(LlmError::MissingCredential)?;

        let request = OpenAiRequest {
            model: &self.config.model,
            messages: Self::messages(prompt, system_prompt),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!(
            "{}/v1/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        );
        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        let parsed: OpenAiResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| LlmError::Parse("Response missing message content".to_string()))
    }

    /// Call the Ollama chat API.
    async fn call_ollama(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String, LlmError> {
        let request = OllamaRequest {
            model: &self.config.model,
            messages: Self::messages(prompt, system_prompt),
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let url = format!("{}/api/chat", self.config.endpoint.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        let parsed: OllamaResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        parsed
            .message
            .and_then(|m| m.content)
            .ok_or_else(|| LlmError::Parse("Response missing message content".to_string()))
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String, LlmError> {
        debug!(
            "Requesting completion from {} ({} prompt chars)",
            self.config.model,
            prompt.len()
        );
        let text = match self.config.provider {
            LlmProvider::OpenAI => self.call_openai(prompt, system_prompt).await?,
            LlmProvider::Ollama => self.call_ollama(prompt, system_prompt).await?,
        };

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(LlmError::Parse("Empty completion".to_string()));
        }
        Ok(text)
    }
}

/// Strip quoting, labels and trailing punctuation from a generated title.
pub fn clean_title(response: &str) -> String {
    let first_line = response.trim().lines().next().unwrap_or_default();
    first_line
        .trim()
        .trim_start_matches("Title:")
        .trim_start_matches("TITLE:")
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '“' || c == '”')
        .trim_end_matches(['.', ' '])
        .trim()
        .to_string()
}

/// Parse tags from LLM response.
pub fn parse_tags(response: &str) -> Vec<String> {
    // Remove common prefixes/formatting
    let cleaned = response
        .trim()
        .trim_start_matches("Tags:")
        .trim_start_matches("TAGS:")
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim();

    cleaned
        .split(',')
        .map(|t| {
            t.trim()
                .to_lowercase()
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '-' && c != '_')
                .to_string()
        })
        .filter(|t| !t.is_empty() && t.len() <= 50)
        .take(10) // Max 10 tags
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        // Simple comma-separated
        let tags = parse_tags("oswald, mexico-city, cia, 1963");
        assert_eq!(tags, vec!["oswald", "mexico-city", "cia", "1963"]);

        // With brackets
        let tags = parse_tags("[warren-commission, fbi]");
        assert_eq!(tags, vec!["warren-commission", "fbi"]);

        // With prefix
        let tags = parse_tags("Tags: dallas, motorcade, memo");
        assert_eq!(tags, vec!["dallas", "motorcade", "memo"]);

        // Mixed case and quoting
        let tags = parse_tags("\"Cold-War\", 'RFK', Ambassador Hotel");
        assert_eq!(tags, vec!["cold-war", "rfk", "ambassador hotel"]);

        // Empty entries dropped
        let tags = parse_tags("cia,, ,fbi");
        assert_eq!(tags, vec!["cia", "fbi"]);
    }

    #[test]
    fn test_parse_tags_caps_count() {
        let many = (0..20).map(|i| format!("tag{}", i)).collect::<Vec<_>>().join(", ");
        assert_eq!(parse_tags(&many).len(), 10);
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("\"The Mexico City Cables\""), "The Mexico City Cables");
        assert_eq!(clean_title("Title: Six Seconds in Dallas."), "Six Seconds in Dallas");
        assert_eq!(
            clean_title("The Ambassador Hotel Files\nHere is why I chose it"),
            "The Ambassador Hotel Files"
        );
        assert_eq!(clean_title("   "), "");
    }

    #[test]
    fn test_default_config() {
        let config = LlmConfig::base_default();
        assert_eq!(config.provider, LlmProvider::OpenAI);
        assert!(config.api_key.is_none());
        assert!(!config.is_configured());
        assert!(config.get_title_prompt().contains("{transcript}"));
        assert!(config.get_tags_prompt().contains("{programme}"));

        let ollama = LlmConfig {
            provider: LlmProvider::Ollama,
            ..LlmConfig::base_default()
        };
        assert!(ollama.is_configured());
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_request() {
        // Unroutable endpoint: the credential check must fail first
        let config = LlmConfig::base_default()
            .with_endpoint("http://127.0.0.1:1")
            .with_api_key(None);
        let client = LlmClient::new(config);
        let err = client.generate("hello", None).await.unwrap_err();
        assert!(matches!(err, LlmError::MissingCredential));
    }
}
