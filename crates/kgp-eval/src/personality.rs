//! Personality evaluation
//!
//! Pools gold/predicted Big Five scores across the corpus and reports
//! per-trait MAE and Pearson correlation, plus the persons with the
//! highest summed absolute error.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use kgp_core::{DocPersonality, Document, StageOutcome, Trait};

/// Number of persons kept in the worst-case list
pub const WORST_K: usize = 3;

/// Round to 4 decimal places
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Pearson product-moment correlation
///
/// `None` with fewer than two pairs, mismatched lengths, zero variance on
/// either side, or a non-finite result.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return None;
    }

    let r = sxy / (sxx.sqrt() * syy.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

// ============================================================================
// Output Types
// ============================================================================

/// Aggregate statistics for one trait
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitMetrics {
    /// Mean absolute error, `None` when no pairs were pooled
    pub mae: Option<f64>,
    /// Pearson r, `None` when undefined
    pub pearson_r: Option<f64>,
    /// Number of pooled pairs
    pub n: usize,
}

/// Error summary for one person with at least one scored trait
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonError {
    pub doc_id: String,
    pub person_id: String,
    /// Sum of absolute errors over scored traits, rounded to 4 decimals
    pub total_abs_error: f64,
    /// Absolute error per scored trait, unrounded
    pub per_trait_errors: BTreeMap<Trait, f64>,
}

/// Output of the personality evaluator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonalityEvaluation {
    pub trait_metrics: BTreeMap<Trait, TraitMetrics>,
    pub worst3_persons: Vec<PersonError>,
}

// ============================================================================
// Evaluation
// ============================================================================

#[derive(Default)]
struct PooledPairs {
    gold: Vec<f64>,
    predicted: Vec<f64>,
}

impl PooledPairs {
    fn metrics(&self) -> TraitMetrics {
        let n = self.gold.len();
        if n == 0 {
            return TraitMetrics::default();
        }

        let total: f64 = self
            .gold
            .iter()
            .zip(&self.predicted)
            .map(|(g, p)| (g - p).abs())
            .sum();

        TraitMetrics {
            mae: Some(round4(total / n as f64)),
            pearson_r: pearson(&self.gold, &self.predicted).map(round4),
            n,
        }
    }
}

/// Evaluate predicted personality scores against the gold corpus
///
/// Persons without a prediction are skipped. A trait contributes only when
/// both gold and prediction define it.
pub fn evaluate_personality(
    gold_docs: &[Document],
    pred_personality: &IndexMap<String, StageOutcome<DocPersonality>>,
) -> PersonalityEvaluation {
    let mut pools: BTreeMap<Trait, PooledPairs> =
        Trait::ALL.iter().map(|t| (*t, PooledPairs::default())).collect();
    let mut person_errors = Vec::new();

    for doc in gold_docs {
        let predicted = pred_personality
            .get(&doc.doc_id)
            .and_then(StageOutcome::value);

        for (person_id, gold) in &doc.personality_labels {
            let Some(pred) = predicted
                .and_then(|persons| persons.get(person_id))
                .and_then(Option::as_ref)
            else {
                continue;
            };

            let mut per_trait_errors = BTreeMap::new();
            let mut total_abs_error = 0.0;

            for t in Trait::ALL {
                let (Some(g), Some(p)) = (gold.big5.get(t), pred.big5.get(t)) else {
                    continue;
                };

                if let Some(pool) = pools.get_mut(&t) {
                    pool.gold.push(g);
                    pool.predicted.push(p);
                }

                let err = (g - p).abs();
                per_trait_errors.insert(t, err);
                total_abs_error += err;
            }

            if per_trait_errors.is_empty() {
                continue;
            }

            debug!(
                doc_id = %doc.doc_id,
                person_id = %person_id,
                traits = per_trait_errors.len(),
                total_abs_error,
                "Scored person"
            );

            person_errors.push(PersonError {
                doc_id: doc.doc_id.clone(),
                person_id: person_id.clone(),
                total_abs_error: round4(total_abs_error),
                per_trait_errors,
            });
        }
    }

    let trait_metrics = pools
        .iter()
        .map(|(t, pool)| (*t, pool.metrics()))
        .collect();

    // Stable: equal totals keep corpus order
    person_errors.sort_by(|a, b| b.total_abs_error.total_cmp(&a.total_abs_error));
    person_errors.truncate(WORST_K);

    PersonalityEvaluation {
        trait_metrics,
        worst3_persons: person_errors,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kgp_core::{Big5Scores, PersonScores};

    fn scores(values: &[(Trait, f64)]) -> Big5Scores {
        values
            .iter()
            .fold(Big5Scores::default(), |acc, (t, v)| acc.with(*t, *v))
    }

    fn prediction(
        entries: Vec<(&str, Vec<(&str, Big5Scores)>)>,
    ) -> IndexMap<String, StageOutcome<DocPersonality>> {
        entries
            .into_iter()
            .map(|(doc_id, persons)| {
                let persons: DocPersonality = persons
                    .into_iter()
                    .map(|(pid, big5)| (pid.to_string(), Some(PersonScores::new(big5))))
                    .collect();
                (doc_id.to_string(), StageOutcome::Ok(persons))
            })
            .collect()
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.09999999999999998), 0.1);
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(0.0), 0.0);
    }

    #[test]
    fn test_pearson_perfect_and_inverse() {
        let xs = [0.1, 0.2, 0.3, 0.4];
        let r = pearson(&xs, &[0.2, 0.4, 0.6, 0.8]).unwrap();
        assert!((r - 1.0).abs() < 1e-9);

        let r = pearson(&xs, &[0.8, 0.6, 0.4, 0.2]).unwrap();
        assert!((r + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_degenerate() {
        assert_eq!(pearson(&[0.5], &[0.4]), None);
        assert_eq!(pearson(&[0.5, 0.5, 0.5], &[0.1, 0.2, 0.3]), None);
        assert_eq!(pearson(&[0.1, 0.2], &[0.3]), None);
    }

    #[test]
    fn test_pearson_known_value() {
        // r for (1,2,3,4,5) vs (2,4,5,4,5) is 0.7746
        let r = pearson(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 5.0, 4.0, 5.0]).unwrap();
        assert_eq!(round4(r), 0.7746);
    }

    #[test]
    fn test_single_pair_worked_example() {
        let docs = vec![Document::new("D1").with_person("P1", scores(&[(Trait::Openness, 0.60)]))];
        let preds = prediction(vec![("D1", vec![("P1", scores(&[(Trait::Openness, 0.50)]))])]);

        let eval = evaluate_personality(&docs, &preds);

        let openness = eval.trait_metrics[&Trait::Openness];
        assert_eq!(openness.mae, Some(0.1));
        assert_eq!(openness.pearson_r, None);
        assert_eq!(openness.n, 1);

        let neuroticism = eval.trait_metrics[&Trait::Neuroticism];
        assert_eq!(neuroticism, TraitMetrics { mae: None, pearson_r: None, n: 0 });

        assert_eq!(eval.worst3_persons.len(), 1);
        assert_eq!(eval.worst3_persons[0].total_abs_error, 0.1);
        assert_eq!(eval.worst3_persons[0].per_trait_errors.len(), 1);
    }

    #[test]
    fn test_identical_predictions_zero_error() {
        let big5 = scores(&[
            (Trait::Openness, 0.60),
            (Trait::Conscientiousness, 0.92),
            (Trait::Extraversion, 0.70),
            (Trait::Agreeableness, 0.75),
            (Trait::Neuroticism, 0.20),
        ]);
        let docs = vec![
            Document::new("D1").with_person("P1", big5),
            Document::new("D2").with_person("P2", big5),
        ];
        let preds = prediction(vec![("D1", vec![("P1", big5)]), ("D2", vec![("P2", big5)])]);

        let eval = evaluate_personality(&docs, &preds);

        for t in Trait::ALL {
            let m = eval.trait_metrics[&t];
            assert_eq!(m.mae, Some(0.0));
            assert_eq!(m.n, 2);
            // identical values on both people: zero variance
            assert_eq!(m.pearson_r, None);
        }
        assert!(eval.worst3_persons.iter().all(|p| p.total_abs_error == 0.0));
    }

    #[test]
    fn test_missing_prediction_is_not_zero() {
        let docs = vec![Document::new("D1")
            .with_person("P1", scores(&[(Trait::Openness, 0.9)]))
            .with_person("P2", scores(&[(Trait::Openness, 0.4)]))];
        let preds = prediction(vec![("D1", vec![("P2", scores(&[(Trait::Openness, 0.5)]))])]);

        let eval = evaluate_personality(&docs, &preds);

        let openness = eval.trait_metrics[&Trait::Openness];
        assert_eq!(openness.n, 1);
        assert_eq!(openness.mae, Some(0.1));
        assert_eq!(eval.worst3_persons.len(), 1);
        assert_eq!(eval.worst3_persons[0].person_id, "P2");
    }

    #[test]
    fn test_trait_missing_on_one_side_is_excluded() {
        let docs = vec![Document::new("D1").with_person(
            "P1",
            scores(&[(Trait::Openness, 0.6), (Trait::Extraversion, 0.3)]),
        )];
        let preds = prediction(vec![(
            "D1",
            vec![("P1", scores(&[(Trait::Openness, 0.6), (Trait::Neuroticism, 0.9)]))],
        )]);

        let eval = evaluate_personality(&docs, &preds);

        assert_eq!(eval.trait_metrics[&Trait::Openness].n, 1);
        assert_eq!(eval.trait_metrics[&Trait::Extraversion].n, 0);
        assert_eq!(eval.trait_metrics[&Trait::Neuroticism].n, 0);
        let person = &eval.worst3_persons[0];
        assert_eq!(
            person.per_trait_errors.keys().copied().collect::<Vec<_>>(),
            vec![Trait::Openness]
        );
    }

    #[test]
    fn test_person_without_shared_traits_not_recorded() {
        let docs = vec![Document::new("D1").with_person("P1", scores(&[(Trait::Openness, 0.6)]))];
        let preds = prediction(vec![("D1", vec![("P1", scores(&[(Trait::Neuroticism, 0.6)]))])]);

        let eval = evaluate_personality(&docs, &preds);
        assert!(eval.worst3_persons.is_empty());
    }

    #[test]
    fn test_failed_stage_marker_is_skipped() {
        let docs = vec![Document::new("D1").with_person("P1", scores(&[(Trait::Openness, 0.6)]))];
        let mut preds = IndexMap::new();
        preds.insert("D1".to_string(), StageOutcome::failed("personality scoring error"));

        let eval = evaluate_personality(&docs, &preds);
        assert_eq!(eval.trait_metrics[&Trait::Openness].n, 0);
        assert!(eval.worst3_persons.is_empty());
    }

    #[test]
    fn test_null_person_prediction_is_skipped() {
        let docs = vec![Document::new("D1")
            .with_person("P1", scores(&[(Trait::Openness, 0.9)]))
            .with_person("P2", scores(&[(Trait::Openness, 0.4)]))];
        let mut persons = DocPersonality::new();
        persons.insert("P1".to_string(), None);
        persons.insert(
            "P2".to_string(),
            Some(PersonScores::new(scores(&[(Trait::Openness, 0.5)]))),
        );
        let mut preds = IndexMap::new();
        preds.insert("D1".to_string(), StageOutcome::Ok(persons));

        let eval = evaluate_personality(&docs, &preds);
        assert_eq!(eval.trait_metrics[&Trait::Openness].n, 1);
        assert_eq!(eval.worst3_persons.len(), 1);
        assert_eq!(eval.worst3_persons[0].person_id, "P2");
    }

    #[test]
    fn test_worst3_ties_keep_corpus_order() {
        let gold = scores(&[(Trait::Neuroticism, 0.5)]);
        let tied = scores(&[(Trait::Neuroticism, 0.7)]);
        let docs = vec![
            Document::new("D1").with_person("PB", gold),
            Document::new("D2").with_person("PA", gold),
            Document::new("D3").with_person("PC", gold),
        ];
        let preds = prediction(vec![
            ("D1", vec![("PB", tied)]),
            ("D2", vec![("PA", tied)]),
            ("D3", vec![("PC", scores(&[(Trait::Neuroticism, 0.9)]))]),
        ]);

        let eval = evaluate_personality(&docs, &preds);

        let ids: Vec<&str> = eval.worst3_persons.iter().map(|p| p.person_id.as_str()).collect();
        assert_eq!(ids, vec!["PC", "PB", "PA"]);
        assert_eq!(
            eval.worst3_persons[1].total_abs_error,
            eval.worst3_persons[2].total_abs_error
        );
    }

    #[test]
    fn test_worst3_sorted_and_truncated() {
        let mut doc = Document::new("D1");
        let mut persons = Vec::new();
        for (i, gap) in [0.1, 0.4, 0.2, 0.3].iter().enumerate() {
            let pid = format!("P{i}");
            doc = doc.with_person(pid.clone(), scores(&[(Trait::Agreeableness, 0.5)]));
            persons.push((pid, scores(&[(Trait::Agreeableness, 0.5 + gap)])));
        }
        let preds = prediction(vec![(
            "D1",
            persons.iter().map(|(p, s)| (p.as_str(), *s)).collect(),
        )]);

        let eval = evaluate_personality(&[doc], &preds);

        let ids: Vec<&str> = eval.worst3_persons.iter().map(|p| p.person_id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "P3", "P2"]);
        let totals: Vec<f64> = eval.worst3_persons.iter().map(|p| p.total_abs_error).collect();
        assert_eq!(totals, vec![0.4, 0.3, 0.2]);

        let r = eval.trait_metrics[&Trait::Agreeableness].pearson_r;
        // gold has zero variance
        assert_eq!(r, None);
    }

    #[test]
    fn test_serialized_shape() {
        let docs = vec![Document::new("D1").with_person("P1", scores(&[(Trait::Openness, 0.60)]))];
        let preds = prediction(vec![("D1", vec![("P1", scores(&[(Trait::Openness, 0.50)]))])]);

        let value = serde_json::to_value(evaluate_personality(&docs, &preds)).unwrap();

        assert_eq!(
            value["trait_metrics"]["neuroticism"],
            serde_json::json!({"mae": null, "pearson_r": null, "n": 0})
        );
        assert_eq!(value["trait_metrics"]["openness"]["mae"], serde_json::json!(0.1));
        assert_eq!(value["worst3_persons"][0]["person_id"], "P1");
        assert!(value["worst3_persons"][0]["per_trait_errors"]["openness"].is_number());
    }
}
