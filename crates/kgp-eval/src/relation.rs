//! Relation evaluation
//!
//! Set-based precision, recall and F1 per document and over the corpus,
//! plus the most frequent false-positive and false-negative triples.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use kgp_core::{Document, RelationTriple};

/// Number of triples kept in each error ranking
pub const TOP_K: usize = 3;

// ============================================================================
// Relation Metrics
// ============================================================================

/// Counts and derived scores for relation extraction
///
/// Scores use a zero default: a zero denominator yields `0.0`, never NaN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationMetrics {
    /// True positives (predicted and in gold)
    #[serde(rename = "tp")]
    pub true_positives: usize,
    /// False positives (predicted, not in gold)
    #[serde(rename = "fp")]
    pub false_positives: usize,
    /// False negatives (in gold, not predicted)
    #[serde(rename = "fn")]
    pub false_negatives: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl RelationMetrics {
    /// Derive precision, recall and F1 from raw counts
    pub fn from_counts(
        true_positives: usize,
        false_positives: usize,
        false_negatives: usize,
    ) -> Self {
        let precision = ratio(true_positives, true_positives + false_positives);
        let recall = ratio(true_positives, true_positives + false_negatives);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            true_positives,
            false_positives,
            false_negatives,
            precision,
            recall,
            f1,
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

// ============================================================================
// Triple Frequency Counter
// ============================================================================

/// A triple together with how often it occurred
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripleCount {
    /// `[subj_id, pred, obj_id]`
    pub triple: (String, String, String),
    pub count: usize,
}

/// Insertion-ordered frequency counter keyed by triple
#[derive(Debug, Clone, Default)]
pub struct TripleCounter {
    counts: IndexMap<RelationTriple, usize>,
}

impl TripleCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence
    pub fn add(&mut self, triple: &RelationTriple) {
        if let Some(count) = self.counts.get_mut(triple) {
            *count += 1;
        } else {
            self.counts.insert(triple.clone(), 1);
        }
    }

    /// Occurrences of a triple
    pub fn count(&self, triple: &RelationTriple) -> usize {
        self.counts.get(triple).copied().unwrap_or(0)
    }

    /// Number of distinct triples
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The `n` most frequent triples; ties keep first-insertion order
    pub fn most_common(&self, n: usize) -> Vec<TripleCount> {
        let mut ranked: Vec<(&RelationTriple, &usize)> = self.counts.iter().collect();
        // sort_by is stable
        ranked.sort_by(|a, b| b.1.cmp(a.1));

        ranked
            .into_iter()
            .take(n)
            .map(|(triple, &count)| TripleCount {
                triple: triple.to_tuple(),
                count,
            })
            .collect()
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Per-document comparison of gold and predicted triple sets
#[derive(Debug, Clone, Default)]
pub struct DocumentComparison {
    pub metrics: RelationMetrics,
    /// Predicted but not gold, in prediction order
    pub false_positives: Vec<RelationTriple>,
    /// Gold but not predicted, in gold order
    pub false_negatives: Vec<RelationTriple>,
}

/// Compare one document's gold and predicted triples as sets
pub fn compare_document(
    gold: &[RelationTriple],
    predicted: &[RelationTriple],
) -> DocumentComparison {
    let gold_set: IndexSet<&RelationTriple> = gold.iter().collect();
    let pred_set: IndexSet<&RelationTriple> = predicted.iter().collect();

    let true_positives = pred_set.iter().filter(|t| gold_set.contains(*t)).count();

    let false_positives: Vec<RelationTriple> = pred_set
        .iter()
        .filter(|t| !gold_set.contains(*t))
        .map(|t| (*t).clone())
        .collect();

    let false_negatives: Vec<RelationTriple> = gold_set
        .iter()
        .filter(|t| !pred_set.contains(*t))
        .map(|t| (*t).clone())
        .collect();

    DocumentComparison {
        metrics: RelationMetrics::from_counts(
            true_positives,
            false_positives.len(),
            false_negatives.len(),
        ),
        false_positives,
        false_negatives,
    }
}

/// Output of the relation evaluator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationEvaluation {
    /// Metrics per document, in corpus order
    pub per_doc: IndexMap<String, RelationMetrics>,
    /// Metrics over summed counts
    pub corpus: RelationMetrics,
    pub top3_fp: Vec<TripleCount>,
    pub top3_fn: Vec<TripleCount>,
}

/// Evaluate predicted relations against the gold corpus
///
/// Documents absent from `pred_relations` are scored against an empty
/// prediction. Predictions for documents not in the corpus are ignored.
pub fn evaluate_relations(
    gold_docs: &[Document],
    pred_relations: &IndexMap<String, Vec<RelationTriple>>,
) -> RelationEvaluation {
    let mut per_doc = IndexMap::with_capacity(gold_docs.len());
    let mut fp_counter = TripleCounter::new();
    let mut fn_counter = TripleCounter::new();
    let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);

    for doc in gold_docs {
        let predicted = pred_relations
            .get(&doc.doc_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let comparison = compare_document(&doc.gold_relations, predicted);
        let metrics = comparison.metrics;

        tp += metrics.true_positives;
        fp += metrics.false_positives;
        fn_ += metrics.false_negatives;

        for triple in &comparison.false_positives {
            fp_counter.add(triple);
        }
        for triple in &comparison.false_negatives {
            fn_counter.add(triple);
        }

        debug!(
            doc_id = %doc.doc_id,
            tp = metrics.true_positives,
            fp = metrics.false_positives,
            fn_ = metrics.false_negatives,
            "Scored document relations"
        );

        per_doc.insert(doc.doc_id.clone(), metrics);
    }

    RelationEvaluation {
        per_doc,
        corpus: RelationMetrics::from_counts(tp, fp, fn_),
        top3_fp: fp_counter.most_common(TOP_K),
        top3_fn: fn_counter.most_common(TOP_K),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(s: &str, p: &str, o: &str) -> RelationTriple {
        RelationTriple::new(s, p, o)
    }

    fn preds(entries: Vec<(&str, Vec<RelationTriple>)>) -> IndexMap<String, Vec<RelationTriple>> {
        entries
            .into_iter()
            .map(|(id, triples)| (id.to_string(), triples))
            .collect()
    }

    #[test]
    fn test_metrics_zero_default() {
        let metrics = RelationMetrics::from_counts(0, 0, 0);
        assert_eq!(metrics.precision, 0.0);
        assert_eq!(metrics.recall, 0.0);
        assert_eq!(metrics.f1, 0.0);

        // Predictions but no hits
        let metrics = RelationMetrics::from_counts(0, 4, 2);
        assert_eq!(metrics.precision, 0.0);
        assert_eq!(metrics.f1, 0.0);
    }

    #[test]
    fn test_metrics_precision_recall() {
        let metrics = RelationMetrics::from_counts(8, 2, 8);
        assert!((metrics.precision - 0.8).abs() < 1e-9);
        assert!((metrics.recall - 0.5).abs() < 1e-9);
        assert!((metrics.f1 - 2.0 * 0.8 * 0.5 / 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_serialize_short_names() {
        let value = serde_json::to_value(RelationMetrics::from_counts(1, 1, 0)).unwrap();
        assert_eq!(value["tp"], 1);
        assert_eq!(value["fp"], 1);
        assert_eq!(value["fn"], 0);
        assert_eq!(value["precision"], 0.5);
    }

    #[test]
    fn test_compare_document_worked_example() {
        let gold = vec![triple("A", "worksAt", "B")];
        let predicted = vec![triple("A", "worksAt", "B"), triple("A", "ledBy", "C")];

        let comparison = compare_document(&gold, &predicted);
        let m = comparison.metrics;

        assert_eq!((m.true_positives, m.false_positives, m.false_negatives), (1, 1, 0));
        assert!((m.precision - 0.5).abs() < 1e-9);
        assert!((m.recall - 1.0).abs() < 1e-9);
        assert!((m.f1 - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(comparison.false_positives, vec![triple("A", "ledBy", "C")]);
    }

    #[test]
    fn test_compare_document_ignores_duplicates_and_order() {
        let gold = vec![triple("A", "worksAt", "B"), triple("C", "founded", "D")];
        let predicted = vec![
            triple("C", "founded", "D"),
            triple("A", "worksAt", "B"),
            triple("A", "worksAt", "B"),
        ];

        let m = compare_document(&gold, &predicted).metrics;
        assert_eq!((m.true_positives, m.false_positives, m.false_negatives), (2, 0, 0));
        assert_eq!((m.precision, m.recall, m.f1), (1.0, 1.0, 1.0));
    }

    #[test]
    fn test_missing_prediction_is_empty() {
        let docs = vec![Document::new("D1").with_relation(triple("A", "worksAt", "B"))];

        let eval = evaluate_relations(&docs, &IndexMap::new());
        let m = eval.per_doc["D1"];
        assert_eq!((m.true_positives, m.false_positives, m.false_negatives), (0, 0, 1));
        assert_eq!(m.recall, 0.0);
        assert_eq!(eval.top3_fn[0].triple, triple("A", "worksAt", "B").to_tuple());
    }

    #[test]
    fn test_empty_document_all_zero() {
        let docs = vec![Document::new("D0")];
        let eval = evaluate_relations(&docs, &preds(vec![("D0", vec![])]));

        assert_eq!(eval.per_doc["D0"], RelationMetrics::default());
        assert_eq!(eval.corpus, RelationMetrics::default());
        assert!(eval.top3_fp.is_empty());
        assert!(eval.top3_fn.is_empty());
    }

    #[test]
    fn test_predictions_do_not_cross_documents() {
        let docs = vec![
            Document::new("D1").with_relation(triple("A", "worksAt", "B")),
            Document::new("D2"),
        ];
        let predictions = preds(vec![("D2", vec![triple("A", "worksAt", "B")])]);

        let eval = evaluate_relations(&docs, &predictions);
        assert_eq!(eval.corpus.true_positives, 0);
        assert_eq!(eval.corpus.false_positives, 1);
        assert_eq!(eval.corpus.false_negatives, 1);
    }

    #[test]
    fn test_top3_ranking_and_ties() {
        let x = triple("X", "ledBy", "Y");
        let y = triple("Y", "founded", "Z");
        let z = triple("Z", "leftCompany", "W");
        let w = triple("W", "mentorsAt", "V");

        let docs = vec![Document::new("D1"), Document::new("D2"), Document::new("D3")];
        let predictions = preds(vec![
            ("D1", vec![w.clone(), x.clone(), y.clone()]),
            ("D2", vec![z.clone(), y.clone()]),
            ("D3", vec![z.clone(), y.clone()]),
        ]);

        let eval = evaluate_relations(&docs, &predictions);

        let counts: Vec<usize> = eval.top3_fp.iter().map(|c| c.count).collect();
        assert_eq!(counts, vec![3, 2, 1]);
        assert_eq!(eval.top3_fp[0].triple, y.to_tuple());
        assert_eq!(eval.top3_fp[1].triple, z.to_tuple());
        // w and x tie at 1; w was inserted first
        assert_eq!(eval.top3_fp[2].triple, w.to_tuple());
    }

    #[test]
    fn test_counter_most_common_fewer_than_n() {
        let mut counter = TripleCounter::new();
        counter.add(&triple("A", "p", "B"));
        counter.add(&triple("A", "p", "B"));

        assert_eq!(counter.len(), 1);
        assert_eq!(counter.count(&triple("A", "p", "B")), 2);
        assert_eq!(counter.most_common(3).len(), 1);
    }

    #[test]
    fn test_top3_serializes_triple_as_array() {
        let docs = vec![Document::new("D1")];
        let eval = evaluate_relations(&docs, &preds(vec![("D1", vec![triple("A", "ledBy", "C")])]));

        let value = serde_json::to_value(&eval.top3_fp).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{"triple": ["A", "ledBy", "C"], "count": 1}])
        );
    }
}
