//! Requests, progress events and results of an audio generation run.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::dialogue::DialogueTurn;
use super::document::{Article, DocumentBrief};

/// Kind of programme being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GenerationFormat {
    /// Investigators discussing declassified documents.
    Report,
    /// Hosts discussing news articles.
    Podcast,
}

impl GenerationFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::Podcast => "podcast",
        }
    }

    /// Human-readable name used in prompts.
    pub fn programme_name(&self) -> &'static str {
        match self {
            Self::Report => "investigative audio report",
            Self::Podcast => "podcast episode",
        }
    }
}

impl fmt::Display for GenerationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage a progress event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStage {
    Preparing,
    Opening,
    Responding,
    Discussing,
    Closing,
    Concatenating,
    Titling,
    Complete,
    Error,
}

impl GenerationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preparing => "preparing",
            Self::Opening => "opening",
            Self::Responding => "responding",
            Self::Discussing => "discussing",
            Self::Closing => "closing",
            Self::Concatenating => "concatenating",
            Self::Titling => "titling",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// Progress event delivered to the caller after each pipeline step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationProgress {
    pub status: GenerationStage,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<u32>,
}

impl GenerationProgress {
    pub fn new(status: GenerationStage, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            current_step: None,
            total_steps: None,
        }
    }

    pub fn with_steps(mut self, current: u32, total: u32) -> Self {
        self.current_step = Some(current);
        self.total_steps = Some(total);
        self
    }
}

/// Material a run talks about.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceMaterial {
    Documents(Vec<DocumentBrief>),
    Articles(Vec<Article>),
}

impl SourceMaterial {
    pub fn format(&self) -> GenerationFormat {
        match self {
            Self::Documents(_) => GenerationFormat::Report,
            Self::Articles(_) => GenerationFormat::Podcast,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Documents(d) => d.len(),
            Self::Articles(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifiers of every input item, in request order.
    pub fn ids(&self) -> Vec<&str> {
        match self {
            Self::Documents(d) => d.iter().map(|d| d.id.as_str()).collect(),
            Self::Articles(a) => a.iter().map(|a| a.id.as_str()).collect(),
        }
    }
}

/// Everything one generation run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub material: SourceMaterial,
    /// Requested persona keys, in speaking order.
    pub participants: Vec<String>,
    /// Requested programme length; the configured default applies when unset.
    pub target_length_seconds: Option<u32>,
}

impl GenerationRequest {
    pub fn format(&self) -> GenerationFormat {
        self.material.format()
    }
}

/// Body of `POST /api/report`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[serde(default)]
    pub documents: Vec<DocumentBrief>,
    #[serde(default)]
    pub selected_investigators: Vec<String>,
    #[serde(default)]
    pub target_length_seconds: Option<u32>,
}

impl From<ReportRequest> for GenerationRequest {
    fn from(req: ReportRequest) -> Self {
        Self {
            material: SourceMaterial::Documents(req.documents),
            participants: req.selected_investigators,
            target_length_seconds: req.target_length_seconds,
        }
    }
}

/// Body of `POST /api/podcast`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastRequest {
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub selected_hosts: Vec<String>,
    #[serde(default)]
    pub target_length_seconds: Option<u32>,
}

impl From<PodcastRequest> for GenerationRequest {
    fn from(req: PodcastRequest) -> Self {
        Self {
            material: SourceMaterial::Articles(req.articles),
            participants: req.selected_hosts,
            target_length_seconds: req.target_length_seconds,
        }
    }
}

/// Terminal outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// True when an earlier run's output was returned without generating.
    #[serde(default)]
    pub cached: bool,
    /// Estimated spoken length of the transcript, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub turns: Vec<DialogueTurn>,
}

impl GenerationResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_request_from_json() {
        let json = r#"{
            "documents": [{"id": "a"}, {"id": "b"}],
            "selectedInvestigators": ["reporter", "privateEye"],
            "targetLengthSeconds": 120
        }"#;
        let req: ReportRequest = serde_json::from_str(json).unwrap();
        let req: GenerationRequest = req.into();
        assert_eq!(req.format(), GenerationFormat::Report);
        assert_eq!(req.material.ids(), vec!["a", "b"]);
        assert_eq!(req.participants, vec!["reporter", "privateEye"]);
        assert_eq!(req.target_length_seconds, Some(120));
    }

    #[test]
    fn test_podcast_request_defaults() {
        let req: PodcastRequest = serde_json::from_str("{}").unwrap();
        let req: GenerationRequest = req.into();
        assert_eq!(req.format(), GenerationFormat::Podcast);
        assert!(req.material.is_empty());
        assert!(req.target_length_seconds.is_none());
    }

    #[test]
    fn test_progress_serializes_camel_case() {
        let p = GenerationProgress::new(GenerationStage::Discussing, "Turn 3").with_steps(3, 22);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["status"], "discussing");
        assert_eq!(json["currentStep"], 3);
        assert_eq!(json["totalSteps"], 22);
    }

    #[test]
    fn test_failure_result() {
        let r = GenerationResult::failure("boom");
        assert!(!r.success);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["error"], "boom");
        assert!(json.get("audioUrl").is_none());
    }
}
