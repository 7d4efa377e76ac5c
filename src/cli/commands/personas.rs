//! Persona listing command.

use console::style;

use foiacast::config::Config;
use foiacast::models::{GenerationFormat, PersonaRoster};

pub fn cmd_personas(config: &Config, format: Option<GenerationFormat>) -> anyhow::Result<()> {
    let roster = PersonaRoster::builtin().with_voice_overrides(&config.tts.voices);
    let formats = match format {
        Some(f) => vec![f],
        None => vec![GenerationFormat::Report, GenerationFormat::Podcast],
    };

    for format in formats {
        let heading = match format {
            GenerationFormat::Report => "Investigators",
            GenerationFormat::Podcast => "Hosts",
        };
        let (first, second) = PersonaRoster::default_pair(format);
        println!("\n{} ({})", style(heading).bold(), format);
        println!("{}", "-".repeat(60));
        for persona in roster.list(format) {
            let marker = if persona.key == first || persona.key == second {
                style("*").green().to_string()
            } else {
                " ".to_string()
            };
            println!(
                "{} {:<12} {:<20} \"{}\"",
                marker, persona.key, persona.name, persona.alias
            );
            println!("    {} voice {}", style("·").dim(), persona.voice.voice_id);
        }
    }
    println!("\n{} default pair", style("*").green());

    Ok(())
}
