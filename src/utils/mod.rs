//! Shared helpers.

pub mod format;

pub use format::{format_duration, format_size, truncate_utf8};
