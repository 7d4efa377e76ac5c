//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod check;
mod generate;
mod personas;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use foiacast::config::{load_settings_with_options, LoadOptions};
use foiacast::models::GenerationFormat;

#[derive(Parser)]
#[command(name = "foiacast")]
#[command(about = "Investigative audio reports and podcasts from declassified documents")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve {
        /// Address to bind: port, host, or host:port
        #[arg(short, long, default_value = "127.0.0.1:3030")]
        bind: String,
    },

    /// Generate a report or podcast from a JSON request file
    Generate {
        /// Request body as accepted by POST /api/report or /api/podcast
        request: PathBuf,
        /// Programme format (inferred from the request when omitted)
        #[arg(short, long, value_enum)]
        format: Option<GenerationFormat>,
    },

    /// List available personas
    Personas {
        /// Only list personas for this format
        #[arg(short, long, value_enum)]
        format: Option<GenerationFormat>,
    },

    /// Check external tools and credentials
    Check,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
    };
    let (settings, config) = load_settings_with_options(options).await?;

    match cli.command {
        Commands::Serve { bind } => serve::cmd_serve(&settings, &config, &bind).await,
        Commands::Generate { request, format } => {
            generate::cmd_generate(&settings, &config, &request, format).await
        }
        Commands::Personas { format } => personas::cmd_personas(&config, format),
        Commands::Check => check::cmd_check(&settings, &config),
    }
}
