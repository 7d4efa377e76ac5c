//! Multi-turn dialogue generation for audio reports and podcast episodes.
//!
//! A run alternates two personas through an opening, a response, a content
//! loop and a closing. Every turn is written by the text generator and
//! spoken by the speech synthesizer into its own file in a per-run work
//! directory; the files are then merged, titled and tagged. The content loop
//! stops once the estimated spoken length reaches the fill target or the
//! turn ceiling would leave no room for the closing.
//!
//! Runs are content-addressed: repeating a request for the same inputs and
//! speakers returns the earlier output without calling either service.

mod cache;
mod duration;
mod prompts;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};

pub use cache::{content_id, output_path, sidecar_path, Sidecar, AUDIO_EXTENSION};
pub use duration::{estimate_seconds, WORDS_PER_SECOND};

use crate::audio::{AudioConcatenator, AudioError};
use crate::llm::{LlmError, TextGenerator, DEFAULT_TAGS_PROMPT, DEFAULT_TITLE_PROMPT};
use crate::models::{
    transcript, DialogueTurn, GenerationFormat, GenerationProgress, GenerationRequest,
    GenerationResult, GenerationStage, Persona, PersonaRoster, SourceMaterial,
};
use crate::services::grouping::{group_documents, DocumentGroup};
use crate::tts::{SpeechSynthesizer, TtsError};
use crate::utils::{format_duration, truncate_utf8};

use prompts::Focus;

/// Progress callback invoked after every pipeline step.
pub type ProgressFn = dyn Fn(GenerationProgress) + Send + Sync;

/// Errors that end a generation run.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("{0}")]
    Validation(String),
    #[error("Text generation failed: {0}")]
    Llm(#[from] LlmError),
    #[error("Speech synthesis failed: {0}")]
    Tts(#[from] TtsError),
    #[error("Audio merge failed: {0}")]
    Audio(#[from] AudioError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Tunables for the dialogue pipeline.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Where finished programmes and their sidecars live.
    pub output_dir: PathBuf,
    /// Parent of the per-run work directories.
    pub work_dir: PathBuf,
    /// URL path that serves files from `output_dir` (`?id=<file>` is appended).
    pub public_url_prefix: String,
    /// Hard ceiling on turns, closing included. Values below 4 act as 4.
    pub max_turns: u32,
    /// Stop the content loop at this fraction of the target length.
    pub target_fill_ratio: f64,
    pub default_target_seconds: u32,
    /// Transcript bytes fed to the title and tag prompts.
    pub transcript_char_budget: usize,
}

impl GenerationSettings {
    pub fn new(output_dir: PathBuf, work_dir: PathBuf) -> Self {
        Self {
            output_dir,
            work_dir,
            public_url_prefix: "/api/audio".to_string(),
            max_turns: 20,
            target_fill_ratio: 0.8,
            default_target_seconds: 300,
            transcript_char_budget: 6000,
        }
    }

    /// Turn ceiling actually applied: opening, response, one content turn and closing.
    pub fn effective_max_turns(&self) -> u32 {
        self.max_turns.max(4)
    }

    /// Upper bound on progress steps: every turn plus merging and titling.
    pub fn total_steps(&self) -> u32 {
        self.effective_max_turns() + 2
    }
}

/// Mutable state of one run.
struct Run<'a> {
    format: GenerationFormat,
    first: Persona,
    second: Persona,
    work_dir: PathBuf,
    turns: Vec<DialogueTurn>,
    estimated: f64,
    step: u32,
    total: u32,
    rng: StdRng,
    progress: &'a ProgressFn,
}

impl Run<'_> {
    fn report(&self, stage: GenerationStage, message: impl Into<String>) {
        (self.progress)(GenerationProgress::new(stage, message).with_steps(self.step, self.total));
    }
}

/// Runs the dialogue pipeline against a text generator and a speech synthesizer.
pub struct DialogueGenerator {
    llm: Arc<dyn TextGenerator>,
    tts: Arc<dyn SpeechSynthesizer>,
    concatenator: AudioConcatenator,
    roster: Arc<PersonaRoster>,
    settings: GenerationSettings,
    title_prompt: String,
    tags_prompt: String,
    seed: Option<u64>,
}

impl DialogueGenerator {
    pub fn new(
        llm: Arc<dyn TextGenerator>,
        tts: Arc<dyn SpeechSynthesizer>,
        roster: Arc<PersonaRoster>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            llm,
            tts,
            concatenator: AudioConcatenator::detect(),
            roster,
            settings,
            title_prompt: DEFAULT_TITLE_PROMPT.to_string(),
            tags_prompt: DEFAULT_TAGS_PROMPT.to_string(),
            seed: None,
        }
    }

    pub fn with_concatenator(mut self, concatenator: AudioConcatenator) -> Self {
        self.concatenator = concatenator;
        self
    }

    /// Templates for title and tag generation (`{programme}`, `{transcript}`).
    pub fn with_metadata_prompts(mut self, title: &str, tags: &str) -> Self {
        self.title_prompt = title.to_string();
        self.tags_prompt = tags.to_string();
        self
    }

    /// Fix the random choices (opening/closing lines, podcast articles).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Run the pipeline. Failures are reported in the result, never returned.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        progress: &ProgressFn,
    ) -> GenerationResult {
        match self.try_generate(request, progress).await {
            Ok(result) => result,
            Err(e) => {
                error!("{} generation failed: {}", request.format(), e);
                progress(GenerationProgress::new(GenerationStage::Error, e.to_string()));
                GenerationResult::failure(e.to_string())
            }
        }
    }

    async fn try_generate(
        &self,
        request: &GenerationRequest,
        progress: &ProgressFn,
    ) -> Result<GenerationResult, GenerationError> {
        let format = request.format();
        if request.material.is_empty() {
            let what = match format {
                GenerationFormat::Report => "documents",
                GenerationFormat::Podcast => "articles",
            };
            return Err(GenerationError::Validation(format!("No {} provided", what)));
        }

        let (first, second) = self.roster.select(format, &request.participants);
        let cid = content_id(
            format,
            &request.material.ids(),
            &[first.key.as_str(), second.key.as_str()],
        );
        let total = self.settings.total_steps();
        progress(
            GenerationProgress::new(
                GenerationStage::Preparing,
                format!(
                    "Preparing {} with {} and {} ({} items)",
                    format.programme_name(),
                    first.name,
                    second.name,
                    request.material.len()
                ),
            )
            .with_steps(0, total),
        );

        if let Some(hit) = cache::lookup(&self.settings.output_dir, &cid).await {
            info!("Reusing cached {} {}", format, hit.path.display());
            progress(
                GenerationProgress::new(GenerationStage::Complete, "Found an existing recording")
                    .with_steps(total, total),
            );
            return Ok(self.cached_result(hit));
        }

        let work_dir = self
            .settings
            .work_dir
            .join(format!("{}-{}", cid, uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&work_dir).await?;
        debug!("Work directory {}", work_dir.display());

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let target_seconds = request
            .target_length_seconds
            .filter(|s| *s > 0)
            .unwrap_or(self.settings.default_target_seconds);

        let mut run = Run {
            format,
            first,
            second,
            work_dir: work_dir.clone(),
            turns: Vec::new(),
            estimated: 0.0,
            step: 0,
            total,
            rng,
            progress,
        };

        let outcome = self
            .produce(&mut run, &request.material, &cid, target_seconds)
            .await;

        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            warn!("Failed to remove work directory {}: {}", work_dir.display(), e);
        }

        outcome
    }

    fn cached_result(&self, hit: cache::CachedOutput) -> GenerationResult {
        let sidecar = hit.sidecar.unwrap_or_default();
        GenerationResult {
            success: true,
            audio_url: Some(self.audio_url(&hit.path)),
            audio_file: Some(hit.path),
            title: sidecar.title,
            tags: Some(sidecar.tags),
            error: None,
            cached: true,
            estimated_seconds: sidecar.estimated_seconds,
            turns: sidecar.transcript,
        }
    }

    fn audio_url(&self, path: &Path) -> String {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        format!(
            "{}?id={}",
            self.settings.public_url_prefix,
            urlencoding::encode(&name)
        )
    }

    async fn produce(
        &self,
        run: &mut Run<'_>,
        material: &SourceMaterial,
        cid: &str,
        target_seconds: u32,
    ) -> Result<GenerationResult, GenerationError> {
        let overview = match material {
            SourceMaterial::Documents(docs) => prompts::documents_overview(docs),
            SourceMaterial::Articles(articles) => prompts::articles_overview(articles),
        };

        // Opening
        let seed = pick(&run.first.opening_lines, &mut run.rng);
        let prompt = prompts::opening_prompt(run.format, &seed, &overview);
        let first = run.first.clone();
        let second = run.second.clone();
        self.speak(run, &first, &second, &prompt).await?;
        run.report(
            GenerationStage::Opening,
            format!("{} opened the {}", first.name, run.format.programme_name()),
        );

        // Response
        let prompt = run
            .turns
            .last()
            .map(|opening| prompts::response_prompt(opening, &overview))
            .ok_or_else(|| GenerationError::Validation("Dialogue has no turns".to_string()))?;
        self.speak(run, &second, &first, &prompt).await?;
        run.report(
            GenerationStage::Responding,
            format!("{} responded", second.name),
        );

        // Content loop
        let groups: Vec<DocumentGroup> = match material {
            SourceMaterial::Documents(docs) => group_documents(docs),
            SourceMaterial::Articles(_) => Vec::new(),
        };
        let target = f64::from(target_seconds) * self.settings.target_fill_ratio;
        let max_turns = self.settings.effective_max_turns() as usize;
        let mut content_turns = 0usize;

        loop {
            let room_for_closing = run.turns.len() + 2 <= max_turns;
            if content_turns > 0 && (run.estimated >= target || !room_for_closing) {
                break;
            }

            let (speaker, partner) = if content_turns % 2 == 0 {
                (&first, &second)
            } else {
                (&second, &first)
            };
            let (focus, label) = match material {
                SourceMaterial::Documents(_) => {
                    let group = &groups[content_turns % groups.len()];
                    let label = match group.places.first() {
                        Some(place) => format!("records from {}", place),
                        None => group
                            .documents
                            .first()
                            .map(|d| d.label().to_string())
                            .unwrap_or_default(),
                    };
                    (Focus::Group(group), label)
                }
                SourceMaterial::Articles(articles) => {
                    let article = articles.choose(&mut run.rng).ok_or_else(|| {
                        GenerationError::Validation("No articles provided".to_string())
                    })?;
                    (Focus::Article(article), article.label().to_string())
                }
            };
            let prompt = run
                .turns
                .last()
                .map(|previous| prompts::content_prompt(focus, previous))
                .ok_or_else(|| GenerationError::Validation("Dialogue has no turns".to_string()))?;
            self.speak(run, speaker, partner, &prompt).await?;
            content_turns += 1;
            run.report(
                GenerationStage::Discussing,
                format!(
                    "{} discussed {} ({} of ~{})",
                    speaker.name,
                    label,
                    format_duration(run.estimated),
                    format_duration(f64::from(target_seconds))
                ),
            );
        }
        info!(
            "Content loop finished after {} turns, ~{:.0}s estimated",
            content_turns, run.estimated
        );

        // Closing
        let seed = pick(&first.closing_lines, &mut run.rng);
        let recap = prompts::transcript_tail(&run.turns, self.settings.transcript_char_budget);
        let prompt = prompts::closing_prompt(run.format, &seed, &recap);
        self.speak(run, &first, &second, &prompt).await?;
        run.report(GenerationStage::Closing, format!("{} closed", first.name));

        // Merge inside the work directory so no partial file appears under the final name
        let inputs: Vec<PathBuf> = run
            .turns
            .iter()
            .filter_map(|t| t.audio_file.clone())
            .collect();
        let merged = run.work_dir.join(format!("{}.{}", cid, AUDIO_EXTENSION));
        let method = self.concatenator.concat(&inputs, &merged).await?;
        run.step += 1;
        run.report(
            GenerationStage::Concatenating,
            format!("Merged {} turns ({})", inputs.len(), method.as_str()),
        );

        // Title and tags
        let full = transcript(&run.turns);
        let excerpt = truncate_utf8(&full, self.settings.transcript_char_budget);
        let title = self
            .llm
            .generate_title(&prompts::render_metadata_prompt(&self.title_prompt, run.format, excerpt))
            .await?;
        let tags = self
            .llm
            .generate_tags(&prompts::render_metadata_prompt(&self.tags_prompt, run.format, excerpt))
            .await?;
        run.step += 1;
        run.report(GenerationStage::Titling, format!("Titled \"{}\"", title));

        // Turn audio is deleted with the work directory
        let turns: Vec<DialogueTurn> = run
            .turns
            .drain(..)
            .map(|mut t| {
                t.audio_file = None;
                t
            })
            .collect();

        tokio::fs::create_dir_all(&self.settings.output_dir).await?;
        let output = output_path(&self.settings.output_dir, cid);
        let sidecar = Sidecar {
            title: Some(title.clone()),
            tags: tags.clone(),
            estimated_seconds: Some(run.estimated),
            transcript: turns.clone(),
        };
        cache::write_sidecar(&output, &sidecar).await?;
        move_file(&merged, &output).await?;

        info!(
            "Finished {} \"{}\": {} turns, ~{}",
            run.format,
            title,
            turns.len(),
            format_duration(run.estimated)
        );
        run.report(GenerationStage::Complete, format!("\"{}\" is ready", title));

        Ok(GenerationResult {
            success: true,
            audio_url: Some(self.audio_url(&output)),
            audio_file: Some(output),
            title: Some(title),
            tags: Some(tags),
            error: None,
            cached: false,
            estimated_seconds: Some(run.estimated),
            turns,
        })
    }

    /// Write and synthesize one turn for `speaker`.
    async fn speak(
        &self,
        run: &mut Run<'_>,
        speaker: &Persona,
        partner: &Persona,
        prompt: &str,
    ) -> Result<(), GenerationError> {
        let index = run.turns.len();
        let system = prompts::system_prompt(run.format, speaker, partner);
        let text = self.llm.generate(prompt, Some(&system)).await?;

        let audio = run
            .work_dir
            .join(format!("turn_{:03}.{}", index, AUDIO_EXTENSION));
        self.tts.synthesize(&text, &speaker.voice, &audio).await?;

        run.estimated += estimate_seconds(&text);
        run.step += 1;
        debug!("Turn {} by {}: {} chars", index, speaker.key, text.len());
        run.turns
            .push(DialogueTurn::new(&speaker.key, &speaker.name, text, audio));
        Ok(())
    }
}

fn pick(lines: &[String], rng: &mut StdRng) -> String {
    lines.choose(rng).cloned().unwrap_or_default()
}

/// Rename, falling back to copy + delete across filesystems.
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    let partial = to.with_extension("partial");
    let copied = match tokio::fs::copy(from, &partial).await {
        Ok(_) => tokio::fs::rename(&partial, to).await,
        Err(e) => Err(e),
    };
    if let Err(e) = copied {
        // Never leave a half-written file where the media endpoint can see it
        if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
            debug!("No partial file to remove at {}: {}", partial.display(), cleanup);
        }
        return Err(e);
    }
    tokio::fs::remove_file(from).await
}
