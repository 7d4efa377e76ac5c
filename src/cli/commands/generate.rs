//! Local generation command.

use std::path::Path;
use std::sync::Arc;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use foiacast::audio::AudioConcatenator;
use foiacast::config::{Config, Settings};
use foiacast::llm::LlmClient;
use foiacast::models::{
    GenerationFormat, GenerationProgress, GenerationRequest, GenerationStage, PersonaRoster,
    PodcastRequest, ReportRequest,
};
use foiacast::services::DialogueGenerator;
use foiacast::tts::SpeechClient;
use foiacast::utils::{format_duration, format_size};

/// Pick the format from the request body when none was given.
fn infer_format(value: &serde_json::Value) -> GenerationFormat {
    if value.get("articles").is_some() || value.get("selectedHosts").is_some() {
        GenerationFormat::Podcast
    } else {
        GenerationFormat::Report
    }
}

fn parse_request(
    contents: &str,
    format: Option<GenerationFormat>,
) -> anyhow::Result<GenerationRequest> {
    let value: serde_json::Value = serde_json::from_str(contents)?;
    let format = format.unwrap_or_else(|| infer_format(&value));
    let request = match format {
        GenerationFormat::Report => serde_json::from_value::<ReportRequest>(value)?.into(),
        GenerationFormat::Podcast => serde_json::from_value::<PodcastRequest>(value)?.into(),
    };
    Ok(request)
}

fn stage_icon(stage: GenerationStage) -> console::StyledObject<&'static str> {
    match stage {
        GenerationStage::Complete => style("✓").green(),
        GenerationStage::Error => style("✗").red(),
        _ => style("→").cyan(),
    }
}

/// Run the pipeline locally, printing every progress event.
pub async fn cmd_generate(
    settings: &Settings,
    config: &Config,
    request_path: &Path,
    format: Option<GenerationFormat>,
) -> anyhow::Result<()> {
    let contents = tokio::fs::read_to_string(request_path).await?;
    let request = parse_request(&contents, format)?;
    settings.ensure_directories()?;

    let roster = Arc::new(PersonaRoster::builtin().with_voice_overrides(&config.tts.voices));
    let generator = DialogueGenerator::new(
        Arc::new(LlmClient::new(config.llm.clone())),
        Arc::new(SpeechClient::new(config.tts.clone())),
        roster,
        config.generation_settings(settings),
    )
    .with_concatenator(AudioConcatenator::detect())
    .with_metadata_prompts(config.llm.get_title_prompt(), config.llm.get_tags_prompt());

    println!(
        "{} Generating {} from {} items",
        style("→").cyan(),
        request.format().programme_name(),
        request.material.len()
    );

    let progress = ProgressBar::new(u64::from(generator.settings().total_steps()));
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
            .unwrap()
            .progress_chars("█▓░"),
    );

    let pb = progress.clone();
    let on_progress = move |event: GenerationProgress| {
        if let Some(step) = event.current_step {
            pb.set_position(u64::from(step));
        }
        pb.println(format!(
            "  {} [{}] {}",
            stage_icon(event.status),
            event.status.as_str(),
            event.message
        ));
        pb.set_message(event.message);
    };

    let result = generator.generate(&request, &on_progress).await;
    progress.finish_and_clear();

    if !result.success {
        let error = result.error.unwrap_or_else(|| "Generation failed".to_string());
        eprintln!("{} {}", style("✗").red(), error);
        anyhow::bail!(error);
    }

    println!(
        "{} {}{}",
        style("✓").green(),
        result.title.as_deref().unwrap_or("Untitled"),
        if result.cached {
            style(" (cached)").dim().to_string()
        } else {
            String::new()
        }
    );
    if let Some(tags) = result.tags.as_ref().filter(|t| !t.is_empty()) {
        println!("  Tags: {}", tags.join(", "));
    }
    if let Some(secs) = result.estimated_seconds {
        println!("  Length: ~{}", format_duration(secs));
    }
    if let Some(file) = &result.audio_file {
        let size = std::fs::metadata(file)
            .map(|m| format_size(m.len()))
            .unwrap_or_else(|_| "?".to_string());
        println!("  File: {} ({})", file.display(), size);
    }
    if let Some(url) = &result.audio_url {
        println!("  URL: {}", url);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use foiacast::models::SourceMaterial;

    #[test]
    fn test_parse_request_infers_format() {
        let report = parse_request(
            r#"{"documents": [{"id": "d1"}], "selectedInvestigators": ["historian"]}"#,
            None,
        )
        .unwrap();
        assert_eq!(report.format(), GenerationFormat::Report);
        assert_eq!(report.participants, vec!["historian".to_string()]);

        let podcast = parse_request(r#"{"articles": [{"id": "a1"}], "targetLengthSeconds": 90}"#, None)
            .unwrap();
        assert_eq!(podcast.format(), GenerationFormat::Podcast);
        assert_eq!(podcast.target_length_seconds, Some(90));
    }

    #[test]
    fn test_parse_request_explicit_format_wins() {
        let request = parse_request(r#"{"articles": []}"#, Some(GenerationFormat::Report)).unwrap();
        assert!(matches!(request.material, SourceMaterial::Documents(ref d) if d.is_empty()));
    }
}
