//! Dialogue turns produced by the generator.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One spoken turn of a generated dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueTurn {
    /// Persona key of the speaker.
    pub speaker: String,
    /// Display name of the speaker.
    pub speaker_name: String,
    pub text: String,
    /// Per-turn audio file; only valid while the run's work directory exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_file: Option<PathBuf>,
}

impl DialogueTurn {
    pub fn new(speaker: &str, speaker_name: &str, text: String, audio_file: PathBuf) -> Self {
        Self {
            speaker: speaker.to_string(),
            speaker_name: speaker_name.to_string(),
            text,
            audio_file: Some(audio_file),
        }
    }

    /// `Name: text` line used in transcripts.
    pub fn transcript_line(&self) -> String {
        format!("{}: {}", self.speaker_name, self.text)
    }
}

/// Render turns as a plain transcript, one line per turn.
pub fn transcript(turns: &[DialogueTurn]) -> String {
    turns
        .iter()
        .map(DialogueTurn::transcript_line)
        .collect::<Vec<_>>()
        .join("\n")
}
