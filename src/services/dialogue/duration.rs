//! Spoken-duration heuristic.

/// Average speaking rate: 150 words per minute.
pub const WORDS_PER_SECOND: f64 = 2.5;

/// Estimated seconds needed to speak `text`.
pub fn estimate_seconds(text: &str) -> f64 {
    text.split_whitespace().count() as f64 / WORDS_PER_SECOND
}
