//! Corpus and artifact loaders
//!
//! Reads the gold corpus and the prediction bundle fully into memory.
//! Any I/O or shape error is fatal for the run.

use std::collections::HashSet;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::{Document, KgpError, PredictionBundle, Result};

/// Read and deserialize a JSON file
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| KgpError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| KgpError::Json {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Pretty-print a value as JSON, creating parent directories as needed
pub fn write_json_pretty<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| KgpError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let json = serde_json::to_string_pretty(value).map_err(|e| KgpError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;

    std::fs::write(path, json).map_err(|e| KgpError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load the gold corpus: an ordered JSON array of documents
///
/// Document ids must be unique.
pub fn load_gold(path: impl AsRef<Path>) -> Result<Vec<Document>> {
    let docs: Vec<Document> = read_json(path.as_ref())?;

    let mut seen = HashSet::new();
    for doc in &docs {
        if !seen.insert(doc.doc_id.as_str()) {
            return Err(KgpError::InvalidInput(format!(
                "duplicate doc_id {} in {}",
                doc.doc_id,
                path.as_ref().display()
            )));
        }
    }

    debug!(documents = docs.len(), path = %path.as_ref().display(), "Loaded gold corpus");
    Ok(docs)
}

/// Load a pipeline artifact bundle holding `pred_relations` and `rule_personality`
pub fn load_pred_artifacts(path: impl AsRef<Path>) -> Result<PredictionBundle> {
    let bundle: PredictionBundle = read_json(path.as_ref())?;
    debug!(
        relation_docs = bundle.pred_relations.len(),
        personality_docs = bundle.rule_personality.len(),
        "Loaded prediction bundle"
    );
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Trait;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_gold() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "gold.json",
            r#"[
                {"doc_id": "D1", "text": "Alice joined Acme Corp.",
                 "gold_relations": [{"subj_id": "D1_E1", "pred": "worksAt", "obj_id": "D1_E2"}],
                 "personality_labels": {
                     "D1_E1": {"big5": {"openness": 0.6}, "explanation": "sample"}}},
                {"doc_id": "D2"}
            ]"#,
        );

        let docs = load_gold(&path).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].gold_relations[0].pred, "worksAt");
        assert_eq!(
            docs[0].personality_labels["D1_E1"].big5.get(Trait::Openness),
            Some(0.6)
        );
        assert!(docs[1].gold_relations.is_empty());
    }

    #[test]
    fn test_load_gold_rejects_missing_triple_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "gold.json",
            r#"[{"doc_id": "D1", "gold_relations": [{"subj_id": "A", "pred": "worksAt"}]}]"#,
        );

        assert!(matches!(load_gold(&path), Err(KgpError::Json { .. })));
    }

    #[test]
    fn test_load_gold_rejects_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "gold.json", r#"[{"doc_id": "D1"}, {"doc_id": "D1"}]"#);

        assert!(matches!(load_gold(&path), Err(KgpError::InvalidInput(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_pred_artifacts("/nonexistent/artifacts.json");
        assert!(matches!(result, Err(KgpError::Io { .. })));
    }

    #[test]
    fn test_load_empty_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "artifacts.json", "{}");

        let bundle = load_pred_artifacts(&path).unwrap();
        assert!(bundle.pred_relations.is_empty());
        assert!(bundle.rule_personality.is_empty());
    }

    #[test]
    fn test_write_json_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.json");

        write_json_pretty(&path, &serde_json::json!({"ok": true})).unwrap();
        let value: serde_json::Value = read_json(&path).unwrap();
        assert_eq!(value["ok"], serde_json::json!(true));
    }
}
