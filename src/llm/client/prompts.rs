//! Default prompts for programme metadata.

pub const DEFAULT_TITLE_PROMPT: &str = r#"Below is the transcript of a generated {programme} about declassified archival records.

{transcript}

Write a short, compelling title for it (at most 10 words). Return ONLY the title, without quotes or explanation."#;

pub const DEFAULT_TAGS_PROMPT: &str = r#"Below is the transcript of a generated {programme} about declassified archival records.

{transcript}

List 3 to 8 short topic tags for it: people, agencies, places, operations or themes. Use lowercase and hyphens for multi-word tags (cold-war, mexico-city). Return ONLY a comma-separated list."#;
