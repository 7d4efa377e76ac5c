//! Prompt construction for each kind of dialogue turn.

use crate::models::{Article, DialogueTurn, DocumentBrief, GenerationFormat, Persona};
use crate::services::grouping::DocumentGroup;
use crate::utils::truncate_utf8;

/// Per-document text allowance inside a content prompt.
const DOCUMENT_TEXT_BUDGET: usize = 800;
/// Article body allowance inside a content prompt.
const ARTICLE_TEXT_BUDGET: usize = 2000;
/// Items named in the opening overview.
const OVERVIEW_ITEMS: usize = 8;

/// What a content turn talks about.
#[derive(Debug, Clone, Copy)]
pub enum Focus<'a> {
    Group(&'a DocumentGroup),
    Article(&'a Article),
}

/// Character prompt for one speaker.
pub fn system_prompt(format: GenerationFormat, speaker: &Persona, partner: &Persona) -> String {
    let setting = match format {
        GenerationFormat::Report => {
            "You are investigating declassified government records out loud, \
             reading between the lines and reasoning from the evidence in front of you."
        }
        GenerationFormat::Podcast => {
            "You are discussing recent articles about declassified records and the \
             history around them."
        }
    };
    format!(
        "You are {name}, known as \"{alias}\", co-presenting the {programme} with {partner}.\n\
         {setting}\n\
         Tone: {tone}\n\
         Humor: {humor}\n\n\
         Rules:\n\
         - Speak in the first person, as spoken audio. 2 to 5 sentences, under 120 words.\n\
         - Output only the words you say: no speaker labels, stage directions, markdown or lists.\n\
         - Stay grounded in the material you are given; say so when something is uncertain.\n\
         - Address {partner_first} naturally now and then.",
        name = speaker.name,
        alias = speaker.alias,
        programme = format.programme_name(),
        partner = partner.name,
        setting = setting,
        tone = speaker.tone,
        humor = speaker.humor_style,
        partner_first = first_name(&partner.name),
    )
}

fn first_name(name: &str) -> &str {
    let mut parts = name.split_whitespace();
    match (parts.next(), parts.next()) {
        // "Dr. Eleanor Hayes" -> "Eleanor"
        (Some(title), Some(next)) if title.ends_with('.') => next,
        (Some(first), _) => first,
        _ => name,
    }
}

/// One line per item, naming what this programme covers.
pub fn documents_overview(documents: &[DocumentBrief]) -> String {
    let mut lines: Vec<String> = documents
        .iter()
        .take(OVERVIEW_ITEMS)
        .map(|d| match d.normalized_date() {
            Some(date) => format!("- {} ({})", d.label(), date.display()),
            None => format!("- {}", d.label()),
        })
        .collect();
    if documents.len() > OVERVIEW_ITEMS {
        lines.push(format!("- and {} more", documents.len() - OVERVIEW_ITEMS));
    }
    lines.join("\n")
}

pub fn articles_overview(articles: &[Article]) -> String {
    let mut lines: Vec<String> = articles
        .iter()
        .take(OVERVIEW_ITEMS)
        .map(|a| match &a.source {
            Some(source) => format!("- {} ({})", a.label(), source),
            None => format!("- {}", a.label()),
        })
        .collect();
    if articles.len() > OVERVIEW_ITEMS {
        lines.push(format!("- and {} more", articles.len() - OVERVIEW_ITEMS));
    }
    lines.join("\n")
}

/// Opening turn, seeded with one of the speaker's opening lines.
pub fn opening_prompt(format: GenerationFormat, seed_line: &str, overview: &str) -> String {
    format!(
        "Open the {programme}. Start from this line, in your own words: \"{seed}\"\n\n\
         Today's material:\n{overview}\n\n\
         Introduce yourself and your co-presenter, and tease what you are about to dig into.",
        programme = format.programme_name(),
        seed = seed_line,
        overview = overview,
    )
}

/// Second turn, reacting to the opening.
pub fn response_prompt(opening: &DialogueTurn, overview: &str) -> String {
    format!(
        "{speaker} just opened the show with:\n\"{text}\"\n\n\
         Today's material:\n{overview}\n\n\
         React to the opening, introduce yourself, and say what you want to find out first.",
        speaker = opening.speaker_name,
        text = opening.text,
        overview = overview,
    )
}

fn describe_document(doc: &DocumentBrief) -> String {
    let mut out = format!("Record: {} [{}]", doc.label(), doc.id);
    match (doc.normalized_date(), &doc.date) {
        (Some(date), _) => out.push_str(&format!("\nDate: {}", date.display())),
        (None, Some(raw)) if !raw.trim().is_empty() => {
            out.push_str(&format!("\nDate (as written): {}", raw.trim()))
        }
        _ => {}
    }
    if !doc.people.is_empty() {
        out.push_str(&format!("\nPeople: {}", doc.people.join(", ")));
    }
    if !doc.agencies.is_empty() {
        out.push_str(&format!("\nAgencies: {}", doc.agencies.join(", ")));
    }
    if !doc.places.is_empty() {
        out.push_str(&format!("\nPlaces: {}", doc.places.join(", ")));
    }
    if let Some(summary) = doc.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        out.push_str(&format!(
            "\nSummary: {}",
            truncate_utf8(summary.trim(), DOCUMENT_TEXT_BUDGET)
        ));
    }
    if let Some(excerpt) = doc.excerpt.as_deref().filter(|s| !s.trim().is_empty()) {
        out.push_str(&format!(
            "\nExcerpt: {}",
            truncate_utf8(excerpt.trim(), DOCUMENT_TEXT_BUDGET)
        ));
    }
    out
}

fn describe_article(article: &Article) -> String {
    let mut out = format!("Article: {}", article.label());
    if let Some(source) = &article.source {
        out.push_str(&format!("\nSource: {}", source));
    }
    if let Some(published) = &article.published {
        out.push_str(&format!("\nPublished: {}", published));
    }
    if let Some(summary) = article.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        out.push_str(&format!(
            "\nSummary: {}",
            truncate_utf8(summary.trim(), ARTICLE_TEXT_BUDGET)
        ));
    }
    if let Some(content) = article.content.as_deref().filter(|s| !s.trim().is_empty()) {
        out.push_str(&format!(
            "\nText: {}",
            truncate_utf8(content.trim(), ARTICLE_TEXT_BUDGET)
        ));
    }
    out
}

/// Content turn about `focus`, continuing from the previous turn.
pub fn content_prompt(focus: Focus<'_>, previous: &DialogueTurn) -> String {
    let material = match focus {
        Focus::Group(group) => {
            let docs = group
                .documents
                .iter()
                .map(describe_document)
                .collect::<Vec<_>>()
                .join("\n\n");
            if group.places.is_empty() {
                docs
            } else {
                format!(
                    "These records are linked by: {}\n\n{}",
                    group.places.join(", "),
                    docs
                )
            }
        }
        Focus::Article(article) => describe_article(article),
    };
    let instruction = match focus {
        Focus::Group(_) => {
            "Walk through what these records show. Point out one concrete detail \
             (a name, a date, a place) and what it might mean."
        }
        Focus::Article(_) => {
            "Discuss this article. Pick out its most interesting claim and give your take on it."
        }
    };

    format!(
        "{speaker} just said:\n\"{text}\"\n\n\
         Respond briefly to that, then move the conversation on to this material:\n\n\
         {material}\n\n{instruction}",
        speaker = previous.speaker_name,
        text = previous.text,
        material = material,
        instruction = instruction,
    )
}

/// Closing turn, seeded with one of the speaker's closing lines.
pub fn closing_prompt(format: GenerationFormat, seed_line: &str, recap: &str) -> String {
    format!(
        "Close the {programme}. Here is how the conversation went:\n{recap}\n\n\
         Sum up the most important thread in a sentence or two, thank your co-presenter, \
         and sign off ending with this line, in your own words: \"{seed}\"",
        programme = format.programme_name(),
        recap = recap,
        seed = seed_line,
    )
}

/// Tail of the transcript that fits in `budget` bytes, cut on a line boundary.
pub fn transcript_tail(turns: &[DialogueTurn], budget: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut used = 0;
    for turn in turns.iter().rev() {
        let line = turn.transcript_line();
        if used + line.len() + 1 > budget {
            if lines.is_empty() {
                lines.push(truncate_utf8(&line, budget).to_string());
            }
            break;
        }
        used += line.len() + 1;
        lines.push(line);
    }
    lines.reverse();
    lines.join("\n")
}

/// Fill `{programme}` and `{transcript}` in a title or tags template.
pub fn render_metadata_prompt(template: &str, format: GenerationFormat, transcript: &str) -> String {
    template
        .replace("{programme}", format.programme_name())
        .replace("{transcript}", transcript)
}
