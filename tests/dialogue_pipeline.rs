//! End-to-end runs of the dialogue pipeline against in-process collaborators.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use foiacast::audio::AudioConcatenator;
use foiacast::llm::{LlmError, TextGenerator};
use foiacast::models::{
    Article, DocumentBrief, GenerationProgress, GenerationRequest, GenerationStage, PersonaRoster,
    PodcastRequest, ReportRequest, VoiceProfile,
};
use foiacast::services::{DialogueGenerator, GenerationSettings};
use foiacast::tts::{SpeechSynthesizer, TtsError};

/// Text generator that answers every dialogue prompt with the same line.
struct ScriptedWriter {
    line: String,
    calls: AtomicUsize,
}

impl ScriptedWriter {
    fn new(words: usize) -> Self {
        Self {
            line: vec!["memo"; words].join(" "),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedWriter {
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match system_prompt {
            Some(_) => Ok(self.line.clone()),
            None if prompt.contains("comma-separated") => Ok("cia, mexico-city, 1963".to_string()),
            None => Ok("\"The Mexico City File\"".to_string()),
        }
    }
}

/// Speech synthesizer that writes a short marker per turn.
#[derive(Default)]
struct TapeRecorder {
    calls: AtomicUsize,
    fail_on: Option<usize>,
}

impl TapeRecorder {
    fn failing_on(call: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: Some(call),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for TapeRecorder {
    async fn synthesize(
        &self,
        _text: &str,
        voice: &VoiceProfile,
        dest: &Path,
    ) -> Result<(), TtsError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on == Some(n) {
            return Err(TtsError::Api("HTTP 500: voice unavailable".to_string()));
        }
        tokio::fs::write(dest, format!("[{}:{}]", voice.voice_id, n)).await?;
        Ok(())
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    settings: GenerationSettings,
    writer: Arc<ScriptedWriter>,
    recorder: Arc<TapeRecorder>,
    generator: DialogueGenerator,
}

fn harness(writer: ScriptedWriter, recorder: TapeRecorder) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let settings = GenerationSettings::new(dir.path().join("audio"), dir.path().join("work"));
    let writer = Arc::new(writer);
    let recorder = Arc::new(recorder);
    let generator = DialogueGenerator::new(
        writer.clone(),
        recorder.clone(),
        Arc::new(PersonaRoster::builtin()),
        settings.clone(),
    )
    .with_concatenator(AudioConcatenator::without_ffmpeg())
    .with_seed(7);

    Harness {
        _dir: dir,
        settings,
        writer,
        recorder,
        generator,
    }
}

fn documents() -> Vec<DocumentBrief> {
    let mut a = DocumentBrief::new("104-10004-10143");
    a.title = Some("Station cable on visitor".to_string());
    a.date = Some("10/01/1963".to_string());
    a.places = vec!["Mexico City".to_string()];
    let mut b = DocumentBrief::new("104-10015-10047");
    b.date = Some("1963-10-08".to_string());
    b.places = vec!["Mexico City".to_string()];
    let mut c = DocumentBrief::new("180-10110-10484");
    c.date = Some("Nov 22, 1963".to_string());
    c.places = vec!["Dallas".to_string()];
    vec![a, b, c]
}

fn report(target: u32) -> GenerationRequest {
    ReportRequest {
        documents: documents(),
        selected_investigators: vec!["reporter".to_string(), "privateEye".to_string()],
        target_length_seconds: Some(target),
    }
    .into()
}

fn collect() -> (Arc<Mutex<Vec<GenerationProgress>>>, impl Fn(GenerationProgress) + Send + Sync) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    (events, move |event: GenerationProgress| sink.lock().unwrap().push(event))
}

fn work_dir_is_empty(settings: &GenerationSettings) -> bool {
    match std::fs::read_dir(&settings.work_dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

#[tokio::test]
async fn test_report_alternates_reporter_and_private_eye() {
    // 40 words is 16 seconds of speech per turn
    let h = harness(ScriptedWriter::new(40), TapeRecorder::default());
    let (events, on_progress) = collect();

    let result = h.generator.generate(&report(120), &on_progress).await;

    assert!(result.success, "{:?}", result.error);
    assert!(!result.cached);
    assert!(result.turns.len() >= 4);
    assert_eq!(result.turns.first().unwrap().speaker, "reporter");
    assert_eq!(result.turns[1].speaker, "privateEye");
    assert_eq!(result.turns.last().unwrap().speaker, "reporter");
    assert!(result.turns.iter().all(|t| t.audio_file.is_none()));
    assert_eq!(result.title.as_deref(), Some("The Mexico City File"));
    assert_eq!(
        result.tags,
        Some(vec![
            "cia".to_string(),
            "mexico-city".to_string(),
            "1963".to_string()
        ])
    );

    let url = result.audio_url.unwrap();
    assert!(url.starts_with("/api/audio?id="), "{}", url);
    let file = result.audio_file.unwrap();
    assert!(file.starts_with(&h.settings.output_dir));
    let merged = std::fs::read_to_string(&file).unwrap();
    assert!(merged.starts_with("[21m00Tcm4TlvDq8ikWAM:1][2EiwWnXFnvU5JabPnv8n:2]"));
    assert!(foiacast::services::dialogue::sidecar_path(&file).exists());
    assert!(work_dir_is_empty(&h.settings));

    // Every turn plus title and tags went through the writer
    assert_eq!(h.recorder.calls(), result.turns.len());
    assert_eq!(h.writer.calls(), result.turns.len() + 2);

    // Stops once 80% of the target is reached
    let estimate = result.estimated_seconds.unwrap();
    assert!(estimate >= 96.0, "{}", estimate);

    let events = events.lock().unwrap();
    assert_eq!(events.first().unwrap().status, GenerationStage::Preparing);
    assert_eq!(events.last().unwrap().status, GenerationStage::Complete);
    assert_eq!(
        events.iter().filter(|e| e.status.is_terminal()).count(),
        1
    );
}

#[tokio::test]
async fn test_repeat_request_is_served_from_cache() {
    let h = harness(ScriptedWriter::new(40), TapeRecorder::default());
    let noop = |_: GenerationProgress| {};

    let first = h.generator.generate(&report(60), &noop).await;
    assert!(first.success);
    let writer_calls = h.writer.calls();
    let recorder_calls = h.recorder.calls();

    let (events, on_progress) = collect();
    let second = h.generator.generate(&report(60), &on_progress).await;

    assert!(second.success);
    assert!(second.cached);
    assert_eq!(second.audio_file, first.audio_file);
    assert_eq!(second.audio_url, first.audio_url);
    assert_eq!(second.title, first.title);
    assert_eq!(second.tags, first.tags);
    assert_eq!(second.turns.len(), first.turns.len());
    assert_eq!(h.writer.calls(), writer_calls);
    assert_eq!(h.recorder.calls(), recorder_calls);
    assert_eq!(
        events.lock().unwrap().last().unwrap().status,
        GenerationStage::Complete
    );
}

#[tokio::test]
async fn test_turn_ceiling_caps_long_programmes() {
    // 20 one-word turns stay far below 80% of a minute
    let h = harness(ScriptedWriter::new(1), TapeRecorder::default());
    let noop = |_: GenerationProgress| {};

    let result = h.generator.generate(&report(60), &noop).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.turns.len(), 20);
    assert_eq!(h.recorder.calls(), 20);
    assert_eq!(result.turns.last().unwrap().speaker, "reporter");
}

#[tokio::test]
async fn test_long_turns_still_get_one_content_turn() {
    // One turn alone overshoots the target
    let h = harness(ScriptedWriter::new(400), TapeRecorder::default());
    let noop = |_: GenerationProgress| {};

    let result = h.generator.generate(&report(30), &noop).await;

    assert!(result.success);
    assert_eq!(result.turns.len(), 4);
}

#[tokio::test]
async fn test_empty_input_fails_without_calls() {
    let h = harness(ScriptedWriter::new(10), TapeRecorder::default());
    let (events, on_progress) = collect();

    let request: GenerationRequest = ReportRequest::default().into();
    let result = h.generator.generate(&request, &on_progress).await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("No documents provided"));
    assert_eq!(h.writer.calls(), 0);
    assert_eq!(h.recorder.calls(), 0);
    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, GenerationStage::Error);

    let podcast: GenerationRequest = PodcastRequest::default().into();
    let result = h.generator.generate(&podcast, &|_| {}).await;
    assert_eq!(result.error.as_deref(), Some("No articles provided"));
}

#[tokio::test]
async fn test_synthesis_failure_leaves_no_output() {
    let h = harness(ScriptedWriter::new(40), TapeRecorder::failing_on(3));
    let (events, on_progress) = collect();

    let result = h.generator.generate(&report(120), &on_progress).await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("voice unavailable"));
    assert!(result.audio_url.is_none());
    assert!(work_dir_is_empty(&h.settings));
    let outputs = std::fs::read_dir(&h.settings.output_dir)
        .map(|d| d.count())
        .unwrap_or(0);
    assert_eq!(outputs, 0);
    assert_eq!(
        events.lock().unwrap().last().unwrap().status,
        GenerationStage::Error
    );
}

#[tokio::test]
async fn test_podcast_uses_default_hosts() {
    let h = harness(ScriptedWriter::new(40), TapeRecorder::default());
    let noop = |_: GenerationProgress| {};

    let mut article = Article::new("a1");
    article.title = Some("Archive release reopens old questions".to_string());
    article.source = Some("The Ledger".to_string());
    let request: GenerationRequest = PodcastRequest {
        articles: vec![article, Article::new("a2")],
        selected_hosts: vec!["nobody".to_string()],
        target_length_seconds: Some(90),
    }
    .into();

    let result = h.generator.generate(&request, &noop).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.turns[0].speaker, "anchor");
    assert_eq!(result.turns[1].speaker, "skeptic");
    assert_eq!(result.turns.last().unwrap().speaker, "anchor");
}
