//! foiacast - investigative audio reports and podcasts from declassified documents.
//!
//! Turns a set of archival records or news articles into a two-voice audio
//! programme: an LLM writes each turn, a speech API voices it, and ffmpeg
//! stitches the turns together.

mod cli;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if cli::is_verbose() {
        "foiacast=info"
    } else {
        "foiacast=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Run CLI
    cli::run().await
}
