//! Speaking personas for generated reports and podcasts.
//!
//! The roster is a fixed table built once at startup. Deployments may swap
//! the synthesized voice of any persona through configuration, but nothing
//! else about a persona changes at runtime.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use super::generation::GenerationFormat;

/// Voice parameters passed to the speech synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceProfile {
    pub voice_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
}

impl VoiceProfile {
    pub fn new(voice_id: &str, stability: f32, similarity_boost: f32) -> Self {
        Self {
            voice_id: voice_id.to_string(),
            stability,
            similarity_boost,
        }
    }
}

/// A character voicing one side of the dialogue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    /// Key used in requests (`reporter`, `privateEye`, ...).
    pub key: String,
    pub name: String,
    pub alias: String,
    pub tone: String,
    pub humor_style: String,
    pub voice: VoiceProfile,
    /// Templates seeding the introduction.
    pub opening_lines: Vec<String>,
    /// Templates seeding the sign-off.
    pub closing_lines: Vec<String>,
}

struct PersonaDef {
    key: &'static str,
    name: &'static str,
    alias: &'static str,
    tone: &'static str,
    humor_style: &'static str,
    voice_id: &'static str,
    stability: f32,
    similarity_boost: f32,
    opening_lines: &'static [&'static str],
    closing_lines: &'static [&'static str],
}

impl PersonaDef {
    fn build(&self) -> Persona {
        Persona {
            key: self.key.to_string(),
            name: self.name.to_string(),
            alias: self.alias.to_string(),
            tone: self.tone.to_string(),
            humor_style: self.humor_style.to_string(),
            voice: VoiceProfile::new(self.voice_id, self.stability, self.similarity_boost),
            opening_lines: self.opening_lines.iter().map(|s| s.to_string()).collect(),
            closing_lines: self.closing_lines.iter().map(|s| s.to_string()).collect(),
        }
    }
}

const INVESTIGATORS: &[PersonaDef] = &[
    PersonaDef {
        key: "reporter",
        name: "Dana Whitfield",
        alias: "The Reporter",
        tone: "measured, precise and relentlessly curious",
        humor_style: "dry understatement",
        voice_id: "21m00Tcm4TlvDq8ikWAM",
        stability: 0.55,
        similarity_boost: 0.75,
        opening_lines: &[
            "Tonight we open a file that stayed classified for the better part of sixty years.",
            "The paper trail starts with a single memo, and it does not stay simple for long.",
            "Some records are released quietly. This batch deserved a closer look.",
        ],
        closing_lines: &[
            "The documents answer some questions and raise sharper ones.",
            "That is where the paper trail ends, for now.",
            "We will keep reading, because the archive is not done talking.",
        ],
    },
    PersonaDef {
        key: "privateEye",
        name: "Frank Dolan",
        alias: "The Private Eye",
        tone: "hard-boiled, suspicious and street-smart",
        humor_style: "sardonic one-liners",
        voice_id: "2EiwWnXFnvU5JabPnv8n",
        stability: 0.45,
        similarity_boost: 0.8,
        opening_lines: &[
            "Every file has a smell to it. This one smells like a cover story.",
            "Somebody typed these pages expecting nobody would ever read them.",
        ],
        closing_lines: &[
            "Case is not closed. It never is with paper like this.",
            "Follow the carbon copies, they always lead somewhere.",
        ],
    },
    PersonaDef {
        key: "historian",
        name: "Dr. Eleanor Hayes",
        alias: "The Historian",
        tone: "scholarly, contextual and careful with claims",
        humor_style: "wry academic asides",
        voice_id: "XrExE9yKIg1WjnnlVkGX",
        stability: 0.65,
        similarity_boost: 0.7,
        opening_lines: &[
            "To read these records properly we have to step back into the autumn of 1963.",
            "Context is everything with declassified material, so let us set the scene.",
        ],
        closing_lines: &[
            "History is written from documents like these, one redaction at a time.",
            "The record is incomplete, but it is far richer than it was.",
        ],
    },
    PersonaDef {
        key: "analyst",
        name: "Marcus Reed",
        alias: "The Analyst",
        tone: "clinical, data-driven and focused on the paper trail",
        humor_style: "deadpan",
        voice_id: "nPczCjzI2devNBz1zQrb",
        stability: 0.6,
        similarity_boost: 0.75,
        opening_lines: &[
            "Let us look at what the routing slips and cable numbers actually tell us.",
            "Strip away the speculation and the documents still have a structure worth mapping.",
        ],
        closing_lines: &[
            "The patterns are in the metadata. They usually are.",
            "Plenty of signal here, and more noise than anyone would like.",
        ],
    },
];

const HOSTS: &[PersonaDef] = &[
    PersonaDef {
        key: "anchor",
        name: "Jordan Blake",
        alias: "The Anchor",
        tone: "warm, conversational and good at keeping things moving",
        humor_style: "playful banter",
        voice_id: "EXAVITQu4vr4xnSDxMaL",
        stability: 0.5,
        similarity_boost: 0.75,
        opening_lines: &[
            "Welcome back to the show, where the archives are the headline.",
            "Grab a coffee, because this week's stories go deep into the files.",
        ],
        closing_lines: &[
            "That is all for this episode. Keep asking questions.",
            "Thanks for listening, and we will see you in the next batch of releases.",
        ],
    },
    PersonaDef {
        key: "skeptic",
        name: "Riley Chen",
        alias: "The Skeptic",
        tone: "sharp, questioning and allergic to hype",
        humor_style: "deadpan sarcasm",
        voice_id: "onwK4e9ZLuTAKqWW03F9",
        stability: 0.5,
        similarity_boost: 0.8,
        opening_lines: &[
            "Before anyone gets excited, let us check what the sources actually say.",
            "I read every one of these so you do not have to. You are welcome.",
        ],
        closing_lines: &[
            "Extraordinary claims, ordinary evidence. Until next time.",
            "Stay curious, stay skeptical.",
        ],
    },
    PersonaDef {
        key: "theorist",
        name: "Casey Morgan",
        alias: "The Theorist",
        tone: "enthusiastic, imaginative and eager to connect the dots",
        humor_style: "excitable tangents",
        voice_id: "TX3LPaxmHKxFdv7VOQHJ",
        stability: 0.4,
        similarity_boost: 0.75,
        opening_lines: &[
            "Okay, I have been waiting all week to talk about this one.",
            "You will not believe what turned up in the latest release.",
        ],
        closing_lines: &[
            "I am not saying it is connected. I am saying look at it again.",
            "The dots are out there. Keep connecting them.",
        ],
    },
];

/// The fixed table of investigators and podcast hosts.
#[derive(Debug, Clone)]
pub struct PersonaRoster {
    investigators: Vec<Persona>,
    hosts: Vec<Persona>,
}

impl Default for PersonaRoster {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PersonaRoster {
    /// The built-in roster.
    pub fn builtin() -> Self {
        Self {
            investigators: INVESTIGATORS.iter().map(PersonaDef::build).collect(),
            hosts: HOSTS.iter().map(PersonaDef::build).collect(),
        }
    }

    /// Replace voice ids for the personas named in `voices` (persona key -> voice id).
    pub fn with_voice_overrides(mut self, voices: &HashMap<String, String>) -> Self {
        for (key, voice_id) in voices {
            let persona = self
                .investigators
                .iter_mut()
                .chain(self.hosts.iter_mut())
                .find(|p| &p.key == key);
            match persona {
                Some(p) => p.voice.voice_id = voice_id.clone(),
                None => warn!("Voice override for unknown persona '{}' ignored", key),
            }
        }
        self
    }

    /// All personas available for a format.
    pub fn list(&self, format: GenerationFormat) -> &[Persona] {
        match format {
            GenerationFormat::Report => &self.investigators,
            GenerationFormat::Podcast => &self.hosts,
        }
    }

    /// Look up a persona by key.
    pub fn get(&self, format: GenerationFormat, key: &str) -> Option<&Persona> {
        self.list(format).iter().find(|p| p.key == key)
    }

    /// Keys of the pair used when a request names no usable personas.
    pub fn default_pair(format: GenerationFormat) -> (&'static str, &'static str) {
        match format {
            GenerationFormat::Report => ("reporter", "privateEye"),
            GenerationFormat::Podcast => ("anchor", "skeptic"),
        }
    }

    /// Pick the two speakers for a run.
    ///
    /// Unknown keys are dropped; missing slots are filled from the format's
    /// default pair. The two returned personas are always distinct.
    pub fn select(&self, format: GenerationFormat, keys: &[String]) -> (Persona, Persona) {
        let mut chosen: Vec<&Persona> = Vec::with_capacity(2);
        for key in keys {
            match self.get(format, key) {
                Some(p) if !chosen.iter().any(|c| c.key == p.key) => chosen.push(p),
                Some(_) => {}
                None => warn!("Unknown {} persona '{}', using defaults", format, key),
            }
            if chosen.len() == 2 {
                break;
            }
        }

        let (first_default, second_default) = Self::default_pair(format);
        for key in [first_default, second_default] {
            if chosen.len() == 2 {
                break;
            }
            if let Some(p) = self.get(format, key) {
                if !chosen.iter().any(|c| c.key == p.key) {
                    chosen.push(p);
                }
            }
        }

        (chosen[0].clone(), chosen[1].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(k: &[&str]) -> Vec<String> {
        k.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_builtin_roster_is_well_formed() {
        let roster = PersonaRoster::builtin();
        for format in [GenerationFormat::Report, GenerationFormat::Podcast] {
            let personas = roster.list(format);
            assert!(personas.len() >= 2);
            for p in personas {
                assert!(!p.opening_lines.is_empty(), "{} has no opening lines", p.key);
                assert!(!p.closing_lines.is_empty(), "{} has no closing lines", p.key);
                assert!(!p.voice.voice_id.is_empty());
            }
            let (a, b) = PersonaRoster::default_pair(format);
            assert!(roster.get(format, a).is_some());
            assert!(roster.get(format, b).is_some());
        }
    }

    #[test]
    fn test_select_requested_pair() {
        let roster = PersonaRoster::builtin();
        let (a, b) = roster.select(GenerationFormat::Report, &keys(&["historian", "analyst"]));
        assert_eq!(a.key, "historian");
        assert_eq!(b.key, "analyst");
    }

    #[test]
    fn test_select_falls_back_to_defaults() {
        let roster = PersonaRoster::builtin();

        let (a, b) = roster.select(GenerationFormat::Report, &[]);
        assert_eq!((a.key.as_str(), b.key.as_str()), ("reporter", "privateEye"));

        let (a, b) = roster.select(GenerationFormat::Podcast, &keys(&["nobody", "ghost"]));
        assert_eq!((a.key.as_str(), b.key.as_str()), ("anchor", "skeptic"));

        // A single known key keeps its slot; the default fills the other
        let (a, b) = roster.select(GenerationFormat::Report, &keys(&["privateEye"]));
        assert_eq!((a.key.as_str(), b.key.as_str()), ("privateEye", "reporter"));
    }

    #[test]
    fn test_select_never_pairs_persona_with_itself() {
        let roster = PersonaRoster::builtin();
        let (a, b) = roster.select(GenerationFormat::Report, &keys(&["reporter", "reporter"]));
        assert_ne!(a.key, b.key);
    }

    #[test]
    fn test_hosts_are_not_investigators() {
        let roster = PersonaRoster::builtin();
        let (a, _) = roster.select(GenerationFormat::Report, &keys(&["skeptic"]));
        assert_eq!(a.key, "reporter");
    }

    #[test]
    fn test_voice_overrides() {
        let mut voices = HashMap::new();
        voices.insert("reporter".to_string(), "custom-voice".to_string());
        voices.insert("nobody".to_string(), "ignored".to_string());
        let roster = PersonaRoster::builtin().with_voice_overrides(&voices);
        assert_eq!(
            roster
                .get(GenerationFormat::Report, "reporter")
                .unwrap()
                .voice
                .voice_id,
            "custom-voice"
        );
    }
}
