//! HTTP request handlers for the web server.

mod api;
mod audio;
mod generate;

// Re-export handlers for use by the router
pub use api::{api_personas, api_status, health};
pub use audio::serve_audio;
pub use generate::{generate_podcast, generate_report, EventNames};
