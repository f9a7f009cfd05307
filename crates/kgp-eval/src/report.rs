//! Evaluation report assembly
//!
//! Merges relation and personality evaluations into one serializable
//! report, writes it to disk and renders a console summary.

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use kgp_core::{write_json_pretty, Document, PredictionBundle, Result};

use crate::personality::{evaluate_personality, PersonalityEvaluation};
use crate::relation::{evaluate_relations, RelationEvaluation, TripleCount};

/// Combined evaluation output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub relation_evaluation: RelationEvaluation,
    pub personality_evaluation: PersonalityEvaluation,
}

impl EvaluationReport {
    /// Run both evaluators over already-loaded inputs
    pub fn build(gold_docs: &[Document], bundle: &PredictionBundle) -> Self {
        let relation_evaluation = evaluate_relations(gold_docs, &bundle.pred_relations);
        let personality_evaluation = evaluate_personality(gold_docs, &bundle.rule_personality);

        info!(
            documents = gold_docs.len(),
            f1 = relation_evaluation.corpus.f1,
            scored_traits = personality_evaluation
                .trait_metrics
                .values()
                .filter(|m| m.n > 0)
                .count(),
            "Evaluation complete"
        );

        Self {
            relation_evaluation,
            personality_evaluation,
        }
    }

    /// Write the report as pretty JSON, creating parent directories
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json_pretty(path.as_ref(), self)?;
        info!(path = %path.as_ref().display(), "Saved evaluation report");
        Ok(())
    }

    /// Human-readable summary for the console
    pub fn summary(&self) -> String {
        let rel = &self.relation_evaluation;
        let corpus = &rel.corpus;
        let mut out = String::new();

        let _ = writeln!(out, "=== Evaluation Report ===\n");
        let _ = writeln!(out, "Documents evaluated: {}\n", rel.per_doc.len());
        let _ = writeln!(out, "Corpus relation metrics:");
        let _ = writeln!(out, "  Precision: {:.4}", corpus.precision);
        let _ = writeln!(out, "  Recall:    {:.4}", corpus.recall);
        let _ = writeln!(out, "  F1 Score:  {:.4}", corpus.f1);
        let _ = writeln!(
            out,
            "  TP: {} | FP: {} | FN: {}\n",
            corpus.true_positives, corpus.false_positives, corpus.false_negatives
        );

        write_triples(&mut out, "Top 3 FP triples:", &rel.top3_fp);
        write_triples(&mut out, "Top 3 FN triples:", &rel.top3_fn);

        let _ = writeln!(out, "Personality trait metrics:");
        for (t, m) in &self.personality_evaluation.trait_metrics {
            let _ = writeln!(
                out,
                "  {:<17} MAE: {:<8} r: {:<8} n: {}",
                t.as_str(),
                format_opt(m.mae),
                format_opt(m.pearson_r),
                m.n
            );
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "Worst 3 persons by total abs error:");
        if self.personality_evaluation.worst3_persons.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for person in &self.personality_evaluation.worst3_persons {
            let traits: Vec<String> = person
                .per_trait_errors
                .iter()
                .map(|(t, e)| format!("{t}={e:.4}"))
                .collect();
            let _ = writeln!(
                out,
                "  {}/{}: {:.4} [{}]",
                person.doc_id,
                person.person_id,
                person.total_abs_error,
                traits.join(", ")
            );
        }

        out
    }
}

fn write_triples(out: &mut String, title: &str, triples: &[TripleCount]) {
    let _ = writeln!(out, "{title}");
    if triples.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for entry in triples {
        let (s, p, o) = &entry.triple;
        let _ = writeln!(out, "  ({s}, {p}, {o}) x{}", entry.count);
    }
    let _ = writeln!(out);
}

fn format_opt(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.4}"))
        .unwrap_or_else(|| "None".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgp_core::{Big5Scores, RelationTriple, Trait};

    fn sample() -> (Vec<Document>, PredictionBundle) {
        let docs = vec![Document::new("D1")
            .with_relation(RelationTriple::new("A", "worksAt", "B"))
            .with_person("P1", Big5Scores::default().with(Trait::Openness, 0.6))];

        let bundle: PredictionBundle = serde_json::from_value(serde_json::json!({
            "pred_relations": {"D1": [
                {"subj_id": "A", "pred": "worksAt", "obj_id": "B"},
                {"subj_id": "A", "pred": "ledBy", "obj_id": "C"}
            ]},
            "rule_personality": {"D1": {"P1": {"big5": {"openness": 0.5}}}}
        }))
        .unwrap();

        (docs, bundle)
    }

    #[test]
    fn test_report_shape() {
        let (docs, bundle) = sample();
        let report = EvaluationReport::build(&docs, &bundle);
        let value = serde_json::to_value(&report).unwrap();

        for key in ["per_doc", "corpus", "top3_fp", "top3_fn"] {
            assert!(value["relation_evaluation"].get(key).is_some(), "missing {key}");
        }
        for key in ["trait_metrics", "worst3_persons"] {
            assert!(value["personality_evaluation"].get(key).is_some(), "missing {key}");
        }
        assert_eq!(
            value["relation_evaluation"]["top3_fp"],
            serde_json::json!([{"triple": ["A", "ledBy", "C"], "count": 1}])
        );
    }

    #[test]
    fn test_summary_sections() {
        let (docs, bundle) = sample();
        let summary = EvaluationReport::build(&docs, &bundle).summary();

        assert!(summary.contains("Corpus relation metrics:"));
        assert!(summary.contains("Precision: 0.5000"));
        assert!(summary.contains("(A, ledBy, C) x1"));
        assert!(summary.contains("Top 3 FN triples:\n  (none)"));
        assert!(summary.contains("openness"));
        assert!(summary.contains("D1/P1: 0.1000"));
    }

    #[test]
    fn test_write_json_creates_directories() {
        let (docs, bundle) = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report/nested/eval_report.json");

        EvaluationReport::build(&docs, &bundle).write_json(&path).unwrap();

        let written: EvaluationReport = kgp_core::read_json(&path).unwrap();
        assert_eq!(written.relation_evaluation.corpus.true_positives, 1);
        assert_eq!(written.personality_evaluation.worst3_persons.len(), 1);
    }
}
