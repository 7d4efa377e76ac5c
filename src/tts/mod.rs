//! Text-to-speech synthesis, one audio file per dialogue turn.

mod config;

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

pub use config::TtsConfig;

use crate::models::VoiceProfile;

const XI_API_KEY_HEADER: &str = "xi-api-key";

/// Errors that can occur during speech synthesis.
#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    #[error("TTS API key is not configured (set TTS_API_KEY or ELEVENLABS_API_KEY)")]
    MissingCredential,
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Speech API returned an empty audio payload")]
    EmptyAudio,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that speaks text into an audio file.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with `voice` and write the audio to `dest`.
    async fn synthesize(&self, text: &str, voice: &VoiceProfile, dest: &Path)
        -> Result<(), TtsError>;
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

/// HTTP client for an ElevenLabs-compatible speech API.
pub struct SpeechClient {
    config: TtsConfig,
    client: Client,
}

impl SpeechClient {
    pub fn new(config: TtsConfig) -> Self {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder.build().unwrap_or_else(|_| Client::new());

        Self { config, client }
    }

    pub fn config(&self) -> &TtsConfig {
        &self.config
    }
}

/// Cut `text` to at most `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl SpeechSynthesizer for SpeechClient {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceProfile,
        dest: &Path,
    ) -> Result<(), TtsError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(TtsError::MissingCredential)?;

        // Single request per turn; overlong text is cut rather than chunked
        let text = truncate_chars(text, self.config.max_chars);

        let url = format!(
            "{}/v1/text-to-speech/{}?output_format={}",
            self.config.endpoint.trim_end_matches('/'),
            urlencoding::encode(&voice.voice_id),
            urlencoding::encode(&self.config.output_format)
        );
        debug!("Synthesizing {} chars with voice {}", text.len(), voice.voice_id);

        let request = SpeechRequest {
            text,
            model_id: &self.config.model_id,
            voice_settings: VoiceSettings {
                stability: voice.stability,
                similarity_boost: voice.similarity_boost,
            },
        };

        let resp = self
            .client
            .post(&url)
            .header(XI_API_KEY_HEADER, api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&request)
            .send()
            .await
            .map_err(|e| TtsError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(TtsError::Api(format!("HTTP {}: {}", status, body)));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| TtsError::Connection(e.to_string()))?;
        if bytes.is_empty() {
            return Err(TtsError::EmptyAudio);
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice() -> VoiceProfile {
        VoiceProfile {
            voice_id: "voice-1".to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
        }
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ééé", 2), "éé");
    }

    #[tokio::test]
    async fn test_missing_credential_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("turn.mp3");
        let client = SpeechClient::new(
            TtsConfig::base_default()
                .with_endpoint("http://127.0.0.1:1")
                .with_api_key(None),
        );

        let err = client.synthesize("hello", &voice(), &dest).await.unwrap_err();
        assert!(matches!(err, TtsError::MissingCredential));
        assert!(!dest.exists());
    }
}
