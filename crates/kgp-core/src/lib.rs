//! KGP Core - Domain models, loaders, and shared types
//!
//! This crate defines the core abstractions used throughout the KGP harness:
//! - Relation triples and Big Five personality scores
//! - Gold documents and prediction bundles
//! - Common error types
//! - The LLM client trait
//! - Configuration management
//! - JSON loaders for corpora and pipeline artifacts

pub mod config;
pub mod corpus;

pub use config::{AppConfig, ConfigError, EvalConfig, LlmConfig, LlmProvider, PipelineConfig};
pub use corpus::{load_gold, load_pred_artifacts, read_json, write_json_pretty};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for KGP operations
#[derive(Error, Debug)]
pub enum KgpError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Prompt file not found: {0}")]
    PromptNotFound(PathBuf),

    #[error("Evidence substring not found in input text: {0:?}")]
    EvidenceNotFound(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Extraction error: {0}")]
    ExtractionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, KgpError>;

// ============================================================================
// Relation Triples
// ============================================================================

/// A relation triple (subject, predicate, object)
///
/// Identity is structural equality of all three fields. The same type is
/// used for gold annotations and predictions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationTriple {
    pub subj_id: String,
    pub pred: String,
    pub obj_id: String,
}

impl RelationTriple {
    /// Create a new triple
    pub fn new(
        subj_id: impl Into<String>,
        pred: impl Into<String>,
        obj_id: impl Into<String>,
    ) -> Self {
        Self {
            subj_id: subj_id.into(),
            pred: pred.into(),
            obj_id: obj_id.into(),
        }
    }

    /// Tuple form, serialized as a 3-element array
    pub fn to_tuple(&self) -> (String, String, String) {
        (self.subj_id.clone(), self.pred.clone(), self.obj_id.clone())
    }
}

impl std::fmt::Display for RelationTriple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.subj_id, self.pred, self.obj_id)
    }
}

// ============================================================================
// Personality Models
// ============================================================================

/// One of the five fixed Big Five personality traits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trait {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Neuroticism,
}

impl Trait {
    /// All traits, in reporting order
    pub const ALL: [Trait; 5] = [
        Trait::Openness,
        Trait::Conscientiousness,
        Trait::Extraversion,
        Trait::Agreeableness,
        Trait::Neuroticism,
    ];

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Openness => "openness",
            Self::Conscientiousness => "conscientiousness",
            Self::Extraversion => "extraversion",
            Self::Agreeableness => "agreeableness",
            Self::Neuroticism => "neuroticism",
        }
    }
}

impl std::fmt::Display for Trait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Trait {
    type Err = KgpError;

    fn from_str(s: &str) -> Result<Self> {
        Trait::ALL
            .into_iter()
            .find(|t| t.as_str() == s.to_lowercase())
            .ok_or_else(|| KgpError::InvalidInput(format!("unknown trait: {s}")))
    }
}

/// Big Five trait scores
///
/// A trait that is absent or `null` in the source JSON is `None`, meaning
/// "not defined". Unknown keys are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Big5Scores {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conscientiousness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraversion: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreeableness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neuroticism: Option<f64>,
}

impl Big5Scores {
    /// Score for a trait, if defined
    pub fn get(&self, t: Trait) -> Option<f64> {
        match t {
            Trait::Openness => self.openness,
            Trait::Conscientiousness => self.conscientiousness,
            Trait::Extraversion => self.extraversion,
            Trait::Agreeableness => self.agreeableness,
            Trait::Neuroticism => self.neuroticism,
        }
    }

    /// Set a trait score
    pub fn set(&mut self, t: Trait, value: f64) {
        let slot = match t {
            Trait::Openness => &mut self.openness,
            Trait::Conscientiousness => &mut self.conscientiousness,
            Trait::Extraversion => &mut self.extraversion,
            Trait::Agreeableness => &mut self.agreeableness,
            Trait::Neuroticism => &mut self.neuroticism,
        };
        *slot = Some(value);
    }

    /// Builder form of [`Big5Scores::set`]
    pub fn with(mut self, t: Trait, value: f64) -> Self {
        self.set(t, value);
        self
    }
}

/// Personality record for one person: `{big5: {...}, explanation?}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonScores {
    #[serde(default)]
    pub big5: Big5Scores,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl PersonScores {
    pub fn new(big5: Big5Scores) -> Self {
        Self {
            big5,
            explanation: None,
        }
    }
}

// ============================================================================
// Documents
// ============================================================================

/// A gold-annotated entity mention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub text: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
}

/// An entity after canonicalization; always carries an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
}

/// One unit of evaluation from the gold corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier, key for all cross-referencing
    pub doc_id: String,

    /// Raw text (used by the extraction pipeline only)
    #[serde(default)]
    pub text: String,

    /// Gold entity mentions (used by the extraction pipeline only)
    #[serde(default)]
    pub gold_entities: Vec<GoldEntity>,

    /// Gold relation triples; duplicates are insignificant
    #[serde(default)]
    pub gold_relations: Vec<RelationTriple>,

    /// Gold personality labels keyed by person id, in file order
    #[serde(default)]
    pub personality_labels: IndexMap<String, PersonScores>,
}

impl Document {
    pub fn new(doc_id: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            text: String::new(),
            gold_entities: Vec::new(),
            gold_relations: Vec::new(),
            personality_labels: IndexMap::new(),
        }
    }

    pub fn with_relation(mut self, triple: RelationTriple) -> Self {
        self.gold_relations.push(triple);
        self
    }

    pub fn with_person(mut self, person_id: impl Into<String>, big5: Big5Scores) -> Self {
        self.personality_labels
            .insert(person_id.into(), PersonScores::new(big5));
        self
    }
}

// ============================================================================
// Stage Outcomes and Prediction Bundles
// ============================================================================

/// Result of one pipeline stage as persisted in artifacts
///
/// Failed and skipped stages are serialized as `{"error": ...}` and
/// `{"skipped": ...}` objects and can be read back from upstream artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageOutcome<T> {
    Ok(T),
    Failed { error: String },
    Skipped { skipped: String },
}

impl<T> StageOutcome<T> {
    /// The value, when the stage succeeded
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Ok(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self::Failed {
            error: error.to_string(),
        }
    }
}

impl<T> From<Result<T>> for StageOutcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(v) => Self::Ok(v),
            Err(e) => Self::failed(e),
        }
    }
}

/// Predicted personality for one document: person id -> scores
///
/// A `null` entry is kept as `None` and means "no prediction".
pub type DocPersonality = IndexMap<String, Option<PersonScores>>;

/// Predictions produced by an (untrusted) extraction pipeline
///
/// Any document or person may be missing. Extra top-level keys in the
/// artifact file are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionBundle {
    #[serde(default)]
    pub pred_relations: IndexMap<String, Vec<RelationTriple>>,

    #[serde(default)]
    pub rule_personality: IndexMap<String, StageOutcome<DocPersonality>>,
}

impl PredictionBundle {
    /// Predicted triples for a document; empty when absent
    pub fn relations_for(&self, doc_id: &str) -> &[RelationTriple] {
        self.pred_relations
            .get(doc_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Predicted scores for a person; `None` when the document is missing,
    /// marked as failed/skipped, or lacks the person
    pub fn personality_for(&self, doc_id: &str, person_id: &str) -> Option<&PersonScores> {
        self.rule_personality
            .get(doc_id)
            .and_then(StageOutcome::value)
            .and_then(|persons| persons.get(person_id))
            .and_then(Option::as_ref)
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for generative model clients
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response for a single-turn prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get client name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
