//! KGP Extractor - Rule-based knowledge extraction
//!
//! Implements the upstream collaborators of the evaluation harness:
//! Named Entity Recognition (NER), subject-verb-object (SVO) relation
//! extraction, canonicalization of entities and predicates, and a
//! cue-word personality baseline.

use serde::{Deserialize, Serialize};

use kgp_core::Result;

/// Extracted entity mention; offsets are byte offsets into the text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub text: String,
    #[serde(rename = "start_char")]
    pub start: usize,
    #[serde(rename = "end_char")]
    pub end: usize,
    #[serde(rename = "label")]
    pub entity_type: String,
    #[serde(skip)]
    pub confidence: f32,
}

impl ExtractedEntity {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether two mentions share at least one byte
    pub fn overlaps(&self, other: &ExtractedEntity) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A subject-verb-object candidate found in one sentence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Svo {
    pub sentence_index: usize,
    pub subj: String,
    /// Surface predicate key, canonicalized later
    pub verb: String,
    pub obj: String,
    pub subj_span: (usize, usize),
    pub obj_span: (usize, usize),
    pub sent_text: String,
}

/// Sentences and SVO candidates for a whole document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SvoExtraction {
    pub sentences: Vec<String>,
    pub svos: Vec<Svo>,
}

/// Trait for entity extractors
pub trait EntityExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Result<Vec<ExtractedEntity>>;
}

/// Trait for relation extractors
pub trait RelationExtractor: Send + Sync {
    fn extract(&self, text: &str, entities: &[ExtractedEntity]) -> Result<SvoExtraction>;
}

pub mod ner;
pub mod normalize;
pub mod personality;
pub mod sentence;
pub mod svo;

pub use ner::RuleBasedNer;
pub use normalize::{canonicalize, canonical_name, normalize_relation, resolve_entity_ids};
pub use personality::RuleBasedPersonality;
pub use svo::RuleBasedSvo;
