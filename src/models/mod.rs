//! Data models for foiacast.

mod dialogue;
mod document;
mod generation;
mod persona;

pub use dialogue::{transcript, DialogueTurn};
pub use document::{Article, DocumentBrief};
pub use generation::{
    GenerationFormat, GenerationProgress, GenerationRequest, GenerationResult, GenerationStage,
    PodcastRequest, ReportRequest, SourceMaterial,
};
pub use persona::{Persona, PersonaRoster, VoiceProfile};
