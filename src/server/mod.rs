//! Web server for generating and serving investigative audio.
//!
//! Provides:
//! - SSE endpoints that run a report or podcast generation and stream progress
//! - Retrieval of generated audio files
//! - Persona listing and a collaborator status check

mod handlers;
mod routes;

pub use handlers::EventNames;
pub use routes::create_router;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::audio::AudioConcatenator;
use crate::config::{Config, Settings};
use crate::llm::LlmClient;
use crate::models::PersonaRoster;
use crate::services::DialogueGenerator;
use crate::tts::SpeechClient;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<DialogueGenerator>,
    pub roster: Arc<PersonaRoster>,
    pub audio_dir: PathBuf,
    /// Interval between SSE `ping` events.
    pub ping_interval: Duration,
    pub ffmpeg_available: bool,
    pub llm_configured: bool,
    pub tts_configured: bool,
}

impl AppState {
    pub fn new(settings: &Settings, config: &Config) -> anyhow::Result<Self> {
        settings.ensure_directories()?;

        let roster = Arc::new(PersonaRoster::builtin().with_voice_overrides(&config.tts.voices));
        let concatenator = AudioConcatenator::detect();
        let ffmpeg_available = concatenator.has_ffmpeg();

        let llm = LlmClient::new(config.llm.clone());
        let tts = SpeechClient::new(config.tts.clone());
        let llm_configured = llm.config().is_configured();
        let tts_configured = tts.config().is_configured();

        let generator = DialogueGenerator::new(
            Arc::new(llm),
            Arc::new(tts),
            roster.clone(),
            config.generation_settings(settings),
        )
        .with_concatenator(concatenator)
        .with_metadata_prompts(config.llm.get_title_prompt(), config.llm.get_tags_prompt());

        Ok(Self {
            generator: Arc::new(generator),
            roster,
            audio_dir: settings.audio_dir.clone(),
            ping_interval: config.ping_interval(),
            ffmpeg_available,
            llm_configured,
            tts_configured,
        })
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, config: &Config, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings, config)?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
