//! foiacast - investigative audio reports and podcasts from declassified documents.
//!
//! The library holds the generation pipeline and the HTTP server; the
//! `foiacast` binary wraps them in a CLI.

pub mod audio;
pub mod config;
pub mod llm;
pub mod models;
pub mod server;
pub mod services;
pub mod tts;
pub mod utils;
