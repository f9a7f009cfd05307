//! Cue-word personality baseline
//!
//! Scores the Big Five traits of a person from the sentences that talk
//! about them. Each trait starts at 0.5 and moves by 0.1 per positive or
//! negative cue word, clamped to `[0, 1]` and rounded to two decimals.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ner::PRONOUNS;
use crate::normalize::canonical_name;
use crate::sentence::split_sentences;
use kgp_core::{Big5Scores, PersonScores, Trait};

/// Neutral score for a trait without cues
pub const BASELINE: f64 = 0.5;

/// Score change per cue word
pub const CUE_WEIGHT: f64 = 0.1;

static WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z][A-Za-z'-]*").expect("valid word regex"));

/// Positive and negative cue words for one trait
///
/// A trailing `*` marks a prefix; other entries match whole words.
struct Lexicon {
    positive: &'static [&'static str],
    negative: &'static [&'static str],
}

fn lexicon(t: Trait) -> Lexicon {
    match t {
        Trait::Openness => Lexicon {
            positive: &[
                "curious*", "creativ*", "imaginat*", "innovat*", "explor*", "artist*",
                "experiment*", "novel", "inventive", "original", "open-minded",
            ],
            negative: &["convention*", "routine*", "traditional", "predictab*", "narrow-minded"],
        },
        Trait::Conscientiousness => Lexicon {
            positive: &[
                "organiz*", "organis*", "diligent*", "meticulous*", "reliab*", "punctual*",
                "deadline*", "thorough*", "careful*", "disciplin*", "responsib*", "efficient*",
                "consistent*", "schedule*", "plan", "plans", "planned", "planning", "detail*",
            ],
            negative: &[
                "careless*", "sloppy", "procrastinat*", "disorganiz*", "forgetful*", "late",
                "missed", "lazy", "messy",
            ],
        },
        Trait::Extraversion => Lexicon {
            positive: &[
                "outgoing", "social*", "talkative", "energetic*", "enthusias*", "gregarious",
                "cheerful*", "meeting*", "networking", "party", "parties", "presented", "lead",
                "leads", "led",
            ],
            negative: &[
                "quiet*", "reserved", "shy", "introvert*", "solitary", "alone", "withdrawn",
            ],
        },
        Trait::Agreeableness => Lexicon {
            positive: &[
                "kind", "kindly", "helpful*", "friendly", "cooperat*", "compassion*", "generous*",
                "supportive", "warm*", "patient*", "trust*", "volunteer*", "mentor*",
            ],
            negative: &[
                "rude*", "hostile", "argumentative", "selfish*", "cold", "harsh*", "stubborn*",
                "critical",
            ],
        },
        Trait::Neuroticism => Lexicon {
            positive: &[
                "anxious*", "anxiety", "worri*", "worry", "nervous*", "stress*", "tense", "moody",
                "upset", "insecure", "panic*", "overwhelm*",
            ],
            negative: &["calm*", "relaxed", "stable", "composed", "confident*", "resilient*"],
        },
    }
}

fn matches_cue(word: &str, cue: &str) -> bool {
    match cue.strip_suffix('*') {
        Some(prefix) => word.starts_with(prefix),
        None => word == cue,
    }
}

/// Rule-based personality scorer
#[derive(Debug, Clone, Default)]
pub struct RuleBasedPersonality;

impl RuleBasedPersonality {
    pub fn new() -> Self {
        Self
    }

    /// Big Five scores for `person` as described in `text`
    pub fn score(&self, person: &str, text: &str) -> Big5Scores {
        self.assess(person, text).big5
    }

    /// Scores plus an explanation listing the cue words found
    pub fn assess(&self, person: &str, text: &str) -> PersonScores {
        let context = person_context(person, text);
        let words: Vec<String> = context
            .iter()
            .flat_map(|s| WORD.find_iter(s))
            .map(|m| m.as_str().to_lowercase())
            .collect();

        let mut big5 = Big5Scores::default();
        let mut cues: BTreeMap<Trait, Vec<String>> = BTreeMap::new();

        for t in Trait::ALL {
            let lex = lexicon(t);
            let mut delta: i32 = 0;
            for word in &words {
                if lex.positive.iter().any(|c| matches_cue(word, c)) {
                    delta += 1;
                    cues.entry(t).or_default().push(word.clone());
                } else if lex.negative.iter().any(|c| matches_cue(word, c)) {
                    delta -= 1;
                    cues.entry(t).or_default().push(format!("-{word}"));
                }
            }
            big5.set(t, trait_score(delta));
        }

        tracing::debug!(
            "Personality for {person:?}: {} context sentences, {} cue traits",
            context.len(),
            cues.len()
        );

        let explanation = (!cues.is_empty()).then(|| {
            cues.iter()
                .map(|(t, words)| format!("{t}: {}", words.join(", ")))
                .collect::<Vec<_>>()
                .join("; ")
        });

        PersonScores { big5, explanation }
    }
}

/// `clamp(0.5 + 0.1 * delta, 0, 1)` rounded to 2 decimals
fn trait_score(delta: i32) -> f64 {
    let raw = (BASELINE + CUE_WEIGHT * f64::from(delta)).clamp(0.0, 1.0);
    (raw * 100.0).round() / 100.0
}

/// Sentences mentioning the person, each followed by any run of
/// pronoun-initial sentences
fn person_context<'a>(person: &str, text: &'a str) -> Vec<&'a str> {
    let name = canonical_name(person);
    let name_tokens: Vec<&str> = name.split_whitespace().filter(|t| t.len() > 1).collect();
    if name_tokens.is_empty() {
        return Vec::new();
    }

    let mut context = Vec::new();
    let mut following = false;

    for sentence in split_sentences(text) {
        let mentions = WORD
            .find_iter(sentence.text)
            .any(|w| name_tokens.contains(&w.as_str()));
        let pronoun_start = WORD
            .find(sentence.text)
            .map(|w| PRONOUNS.contains(&w.as_str()))
            .unwrap_or(false);

        if mentions || (following && pronoun_start) {
            context.push(sentence.text);
            following = true;
        } else {
            following = false;
        }
    }

    context
}
