//! KGP Eval - Evaluation engine
//!
//! Compares predicted relation triples and personality scores against
//! gold annotations:
//! - relation precision/recall/F1 per document and over the corpus
//! - most frequent false-positive and false-negative triples
//! - per-trait MAE and Pearson r, worst-scored persons
//!
//! Evaluators are pure functions over loaded inputs; malformed input is
//! rejected by the loaders in `kgp-core` before evaluation starts.

pub mod personality;
pub mod relation;
pub mod report;

pub use personality::{
    evaluate_personality, pearson, round4, PersonError, PersonalityEvaluation, TraitMetrics,
};
pub use relation::{
    compare_document, evaluate_relations, RelationEvaluation, RelationMetrics, TripleCount,
    TripleCounter,
};
pub use report::EvaluationReport;
