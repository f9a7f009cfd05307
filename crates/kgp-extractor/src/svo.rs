//! Subject-verb-object extraction
//!
//! Finds verb cues from a surface lexicon in each sentence and pairs them
//! with the nearest entity mention on either side. The verb recorded on an
//! [`Svo`] is the surface predicate key understood by
//! [`normalize_relation`](crate::normalize_relation).

use regex::Regex;

use crate::ner::{EntityLabel, PRONOUNS};
use crate::sentence::{split_sentences, Sentence};
use crate::{ExtractedEntity, RelationExtractor, Svo, SvoExtraction};
use kgp_core::Result;

// ============================================================================
// Verb Cues
// ============================================================================

/// A verb cue and the surface predicate it stands for
struct VerbCue {
    regex: Regex,
    key: &'static str,
    /// Required label of the object, if any
    object_label: Option<EntityLabel>,
}

/// Rule-based SVO extractor
pub struct RuleBasedSvo {
    cues: Vec<VerbCue>,
}

impl RuleBasedSvo {
    pub fn new() -> Self {
        let mut svo = Self { cues: Vec::new() };
        svo.init_cues();
        svo
    }

    fn init_cues(&mut self) {
        use EntityLabel::{Organization, Role};

        self.add_cue(r"\b(?:re)?joined\b", "joined", Some(Organization));
        self.add_cue(
            r"\b(?:works|worked|working)[ \t]+(?:at|for)\b",
            "works_at",
            Some(Organization),
        );
        self.add_cue(r"\b(?:left|quit|departed)\b", "left", Some(Organization));
        self.add_cue(r"\b(?:co-)?founded\b|\bestablished\b", "founded", Some(Organization));
        self.add_cue(r"\bpromoted[ \t]+to\b", "promotedTo", Some(Role));
        self.add_cue(
            r"\bcontracted[ \t]+with\b|\bsigned[ \t]+a[ \t]+contract[ \t]+with\b",
            "contractedWith",
            None,
        );
        self.add_cue(r"\borganized\b[^.!?]*?\bwith\b", "organizedWith", Some(Organization));
        self.add_cue(r"\bconsult(?:s|ed|ing)?[ \t]+for\b", "consultedFor", Some(Organization));
        self.add_cue(
            r"\bvolunteer(?:s|ed|ing)?[ \t]+(?:at|with)\b",
            "volunteersAt",
            Some(Organization),
        );
        self.add_cue(r"\bmentor(?:s|ed|ing)\b", "mentorsAt", Some(Organization));
        self.add_cue(r"\bpartner(?:s|ed)?[ \t]+with\b", "partneredWith", None);
        self.add_cue(r"\b(?:recruited|hired)[ \t]+from\b", "recruitedFrom", Some(Organization));
        self.add_cue(r"\bas[ \t]+(?:a|an|the)\b", "role", Some(Role));
    }

    fn add_cue(&mut self, pattern: &str, key: &'static str, object_label: Option<EntityLabel>) {
        match Regex::new(pattern) {
            Ok(regex) => self.cues.push(VerbCue {
                regex,
                key,
                object_label,
            }),
            Err(e) => tracing::warn!("Skipping invalid verb cue {pattern:?}: {e}"),
        }
    }

    /// Extract SVOs from a single sentence
    ///
    /// `last_person` is the most recent person mention before this sentence;
    /// it stands in for a pronoun subject.
    fn extract_from_sentence(
        &self,
        index: usize,
        sentence: &Sentence<'_>,
        mentions: &[&ExtractedEntity],
        last_person: Option<&ExtractedEntity>,
    ) -> Vec<Svo> {
        let mut svos = Vec::new();

        for cue in &self.cues {
            for mat in cue.regex.find_iter(sentence.text) {
                let verb_start = sentence.start + mat.start();
                let verb_end = sentence.start + mat.end();

                let subject = nearest_subject(mentions, verb_start).or_else(|| {
                    pronoun_before(&sentence.text[..mat.start()])
                        .then_some(last_person)
                        .flatten()
                });
                let object = nearest_object(mentions, verb_end, cue.object_label);

                let (Some(subj), Some(obj)) = (subject, object) else {
                    continue;
                };
                if subj.start == obj.start {
                    continue;
                }

                svos.push(Svo {
                    sentence_index: index,
                    subj: subj.text.clone(),
                    verb: cue.key.to_string(),
                    obj: obj.text.clone(),
                    subj_span: (subj.start, subj.end),
                    obj_span: (obj.start, obj.end),
                    sent_text: sentence.text.to_string(),
                });
            }
        }

        svos.sort_by_key(|s| s.obj_span.0);
        svos
    }
}

impl Default for RuleBasedSvo {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationExtractor for RuleBasedSvo {
    fn extract(&self, text: &str, entities: &[ExtractedEntity]) -> Result<SvoExtraction> {
        let sentences = split_sentences(text);
        let mut svos = Vec::new();
        let mut last_person: Option<&ExtractedEntity> = None;

        for (index, sentence) in sentences.iter().enumerate() {
            let mentions: Vec<&ExtractedEntity> = entities
                .iter()
                .filter(|e| sentence.contains_span(e.start, e.end))
                .collect();

            svos.extend(self.extract_from_sentence(index, sentence, &mentions, last_person));

            if let Some(person) = mentions
                .iter()
                .rev()
                .find(|e| e.entity_type == EntityLabel::Person.as_str())
                .copied()
            {
                last_person = Some(person);
            }
        }

        tracing::debug!(
            "SVO extraction: {} sentences, {} triples",
            sentences.len(),
            svos.len()
        );

        Ok(SvoExtraction {
            sentences: sentences.iter().map(|s| s.text.to_string()).collect(),
            svos,
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Whether a personal pronoun occurs in `prefix`
fn pronoun_before(prefix: &str) -> bool {
    prefix
        .split(|c: char| !c.is_alphabetic())
        .any(|w| PRONOUNS.iter().any(|p| p.eq_ignore_ascii_case(w)))
}

/// Closest person before the verb, else the closest relational mention
fn nearest_subject<'a>(
    mentions: &[&'a ExtractedEntity],
    verb_start: usize,
) -> Option<&'a ExtractedEntity> {
    let before: Vec<&'a ExtractedEntity> = mentions
        .iter()
        .rev()
        .filter(|e| e.end <= verb_start)
        .copied()
        .collect();
    before
        .iter()
        .find(|e| e.entity_type == EntityLabel::Person.as_str())
        .or_else(|| before.iter().find(|e| EntityLabel::is_relational(&e.entity_type)))
        .copied()
}

/// First relational mention after the verb, honoring the cue's object label
fn nearest_object<'a>(
    mentions: &[&'a ExtractedEntity],
    verb_end: usize,
    label: Option<EntityLabel>,
) -> Option<&'a ExtractedEntity> {
    mentions
        .iter()
        .filter(|e| e.start >= verb_end)
        .find(|e| match label {
            Some(l) => e.entity_type == l.as_str(),
            None => EntityLabel::is_relational(&e.entity_type),
        })
        .copied()
}
