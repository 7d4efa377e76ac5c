//! Tool and credential check command.

use console::style;

use foiacast::config::{Config, Settings};

fn report(ok: bool, label: &str, detail: &str) {
    let icon = if ok { style("✓").green() } else { style("✗").red() };
    println!("  {} {:<14} {}", icon, label, detail);
}

/// Report whether ffmpeg, ffprobe and the API credentials are available.
pub fn cmd_check(settings: &Settings, config: &Config) -> anyhow::Result<()> {
    println!("{} Checking collaborators", style("→").cyan());

    for tool in ["ffmpeg", "ffprobe"] {
        match which::which(tool) {
            Ok(path) => report(true, tool, &path.display().to_string()),
            Err(_) => report(
                false,
                tool,
                "not found (audio will be byte-concatenated)",
            ),
        }
    }

    let llm = &config.llm;
    report(
        llm.is_configured(),
        "LLM",
        &format!("{:?} {} ({})", llm.provider, llm.model, llm.endpoint),
    );
    report(
        config.tts.is_configured(),
        "TTS",
        &format!("{} ({})", config.tts.model_id, config.tts.endpoint),
    );
    report(
        settings.audio_dir.is_dir(),
        "Audio dir",
        &settings.audio_dir.display().to_string(),
    );

    if !llm.is_configured() || !config.tts.is_configured() {
        println!(
            "\n{} Set LLM_API_KEY (or OPENAI_API_KEY / GROQ_API_KEY) and TTS_API_KEY (or ELEVENLABS_API_KEY)",
            style("!").yellow()
        );
    }

    Ok(())
}
