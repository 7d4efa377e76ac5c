//! Command-line interface for foiacast.

mod commands;

pub use commands::{is_verbose, run};
