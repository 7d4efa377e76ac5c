//! LLM integration for dialogue, titles and tags.

mod client;

pub use client::{
    clean_title, parse_tags, LlmClient, LlmConfig, LlmError, LlmProvider, TextGenerator,
    DEFAULT_TAGS_PROMPT, DEFAULT_TITLE_PROMPT,
};
