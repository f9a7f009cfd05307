//! KGP Pipeline - Extraction pipeline orchestration
//!
//! Runs extraction, normalization, graph construction and personality
//! scoring for one document at a time. Every stage result is kept as a
//! [`StageOutcome`] so a failing stage is recorded instead of aborting the
//! document.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use kgp_core::{
    write_json_pretty, AppConfig, DocPersonality, Document, KgpError, PredictionBundle,
    RelationTriple, Result, StageOutcome,
};
use kgp_extractor::normalize::Canonicalized;
use kgp_extractor::{
    canonicalize, resolve_entity_ids, EntityExtractor, ExtractedEntity, RelationExtractor,
    RuleBasedNer, RuleBasedPersonality, RuleBasedSvo, SvoExtraction,
};
use kgp_graph::{JsonLdDocument, KnowledgeGraph};
use kgp_llm::{LlmCaller, LlmResponse};

// ============================================================================
// Artifacts
// ============================================================================

/// A relation candidate in surface form, before normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRelation {
    pub subj_id: String,
    pub pred: String,
    pub obj_id: String,
    pub evidence: Option<String>,
}

impl CandidateRelation {
    fn to_triple(&self) -> RelationTriple {
        RelationTriple::new(self.subj_id.clone(), self.pred.clone(), self.obj_id.clone())
    }
}

/// Model response for one sentence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceResponse {
    pub sentence: String,
    pub resp: StageOutcome<LlmResponse>,
}

/// Everything the pipeline produced for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocArtifacts {
    pub doc_id: String,
    pub ner: StageOutcome<Vec<ExtractedEntity>>,
    pub svos: StageOutcome<SvoExtraction>,
    pub llm_re: Vec<SentenceResponse>,
    pub candidate_relations_raw: Vec<CandidateRelation>,
    pub normalized: StageOutcome<Canonicalized>,
    pub kg_jsonld: StageOutcome<JsonLdDocument>,
    pub rule_personality: StageOutcome<DocPersonality>,
}

impl DocArtifacts {
    /// Canonical relations, empty when normalization failed
    pub fn relations(&self) -> &[RelationTriple] {
        self.normalized
            .value()
            .map(|n| n.relations.as_slice())
            .unwrap_or(&[])
    }
}

/// Collect artifacts into the bundle consumed by the evaluator
pub fn bundle_from_artifacts<'a>(
    artifacts: impl IntoIterator<Item = &'a DocArtifacts>,
) -> PredictionBundle {
    let mut pred_relations = IndexMap::new();
    let mut rule_personality = IndexMap::new();

    for a in artifacts {
        pred_relations.insert(a.doc_id.clone(), a.relations().to_vec());
        rule_personality.insert(a.doc_id.clone(), a.rule_personality.clone());
    }

    PredictionBundle {
        pred_relations,
        rule_personality,
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Prompted relation extraction settings
struct LlmStage {
    caller: LlmCaller,
    prompt_path: PathBuf,
}

/// Extraction pipeline
pub struct Pipeline {
    ner: Box<dyn EntityExtractor>,
    svo: Box<dyn RelationExtractor>,
    personality: RuleBasedPersonality,
    llm: Option<LlmStage>,
}

impl Pipeline {
    /// Rule-based pipeline without the model stage
    pub fn new() -> Self {
        Self {
            ner: Box::new(RuleBasedNer::new()),
            svo: Box::new(RuleBasedSvo::new()),
            personality: RuleBasedPersonality::new(),
            llm: None,
        }
    }

    /// Pipeline configured from `config.pipeline` and `config.llm`
    ///
    /// The model stage runs only when enabled and a prompt is configured.
    pub fn from_config(config: &AppConfig) -> Self {
        let pipeline = Self::new();
        match (&config.pipeline.prompt_re_path, config.pipeline.use_llm) {
            (Some(prompt), true) => pipeline.with_llm(LlmCaller::from_config(&config.llm), prompt),
            (None, true) => {
                tracing::warn!("LLM stage enabled without a relation prompt; skipping it");
                pipeline
            }
            _ => pipeline,
        }
    }

    /// Enable the model stage with a relation-extraction prompt
    pub fn with_llm(mut self, caller: LlmCaller, prompt_path: impl Into<PathBuf>) -> Self {
        self.llm = Some(LlmStage {
            caller,
            prompt_path: prompt_path.into(),
        });
        self
    }

    /// Replace the entity extractor
    pub fn with_entity_extractor(mut self, ner: Box<dyn EntityExtractor>) -> Self {
        self.ner = ner;
        self
    }

    /// Replace the relation extractor
    pub fn with_relation_extractor(mut self, svo: Box<dyn RelationExtractor>) -> Self {
        self.svo = svo;
        self
    }

    /// Run every stage for one document
    pub async fn run_for_doc(&self, doc: &Document) -> DocArtifacts {
        let text = doc.text.as_str();
        tracing::debug!("Running pipeline for {}", doc.doc_id);

        // 1) Entities
        let ner: StageOutcome<Vec<ExtractedEntity>> = match self.ner.extract(text) {
            Ok(entities) => StageOutcome::Ok(entities),
            Err(e) => StageOutcome::failed(format!("NER error: {e}")),
        };

        // 2) SVO candidates
        let entities = ner.value().map(Vec::as_slice).unwrap_or(&[]);
        let svos: StageOutcome<SvoExtraction> = match self.svo.extract(text, entities) {
            Ok(svos) => StageOutcome::Ok(svos),
            Err(e) => StageOutcome::failed(format!("SVO extraction error: {e}")),
        };

        // 3) Prompted extraction, one call per sentence
        let llm_re = match (&self.llm, svos.value()) {
            (Some(stage), Some(extraction)) => self.run_llm(stage, &extraction.sentences).await,
            _ => Vec::new(),
        };

        // 4) Surface-form candidates
        let candidate_relations_raw = collect_candidates(svos.value(), &llm_re);

        // 5) Normalization
        let raw: Vec<RelationTriple> = candidate_relations_raw
            .iter()
            .map(CandidateRelation::to_triple)
            .collect();
        let resolved = resolve_entity_ids(&raw, &doc.gold_entities);
        let normalized = canonicalize(&doc.gold_entities, &resolved);

        // 6) Knowledge graph
        let kg_jsonld =
            KnowledgeGraph::build(&normalized.entities, &normalized.relations).to_jsonld();

        // 7) Personality
        let rule_personality = match self.score_personality(doc) {
            Ok(scores) => StageOutcome::Ok(scores),
            Err(e) => StageOutcome::failed(format!("personality scoring error: {e}")),
        };

        DocArtifacts {
            doc_id: doc.doc_id.clone(),
            ner,
            svos,
            llm_re,
            candidate_relations_raw,
            normalized: StageOutcome::Ok(normalized),
            kg_jsonld: StageOutcome::Ok(kg_jsonld),
            rule_personality,
        }
    }

    async fn run_llm(&self, stage: &LlmStage, sentences: &[String]) -> Vec<SentenceResponse> {
        let mut out = Vec::with_capacity(sentences.len());
        for sentence in sentences {
            let resp = match stage.caller.call_text(&stage.prompt_path, sentence).await {
                Ok(resp) => StageOutcome::Ok(resp),
                Err(e) => {
                    tracing::warn!("LLM extraction failed for sentence: {e}");
                    StageOutcome::failed(e)
                }
            };
            out.push(SentenceResponse {
                sentence: sentence.clone(),
                resp,
            });
        }
        out
    }

    /// Scores for every gold entity typed `Person`
    fn score_personality(&self, doc: &Document) -> Result<DocPersonality> {
        let mut scores = DocPersonality::new();
        for entity in &doc.gold_entities {
            if entity.entity_type.as_deref() != Some("Person") {
                continue;
            }
            let id = entity.id.as_ref().ok_or_else(|| {
                KgpError::InvalidInput(format!("person entity without id: {}", entity.text))
            })?;
            scores.insert(
                id.clone(),
                Some(self.personality.assess(&entity.text, &doc.text)),
            );
        }
        Ok(scores)
    }

    /// Run one document and write `pipeline_<doc_id>.json` into `outdir`
    pub async fn run_and_save(&self, doc: &Document, outdir: impl AsRef<Path>) -> Result<PathBuf> {
        let artifacts = self.run_for_doc(doc).await;
        save_artifacts(&artifacts, outdir)
    }

    /// Run a corpus and collect the evaluator's prediction bundle
    pub async fn run_corpus(&self, docs: &[Document]) -> PredictionBundle {
        let mut artifacts = Vec::with_capacity(docs.len());
        for doc in docs {
            artifacts.push(self.run_for_doc(doc).await);
        }
        tracing::info!("Pipeline processed {} documents", artifacts.len());
        bundle_from_artifacts(&artifacts)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Write artifacts as `pipeline_<doc_id>.json` into `outdir`
pub fn save_artifacts(artifacts: &DocArtifacts, outdir: impl AsRef<Path>) -> Result<PathBuf> {
    let path = outdir
        .as_ref()
        .join(format!("pipeline_{}.json", artifacts.doc_id));
    write_json_pretty(&path, artifacts)?;
    tracing::debug!("Saved artifacts to {}", path.display());
    Ok(path)
}

fn collect_candidates(
    svos: Option<&SvoExtraction>,
    llm_re: &[SentenceResponse],
) -> Vec<CandidateRelation> {
    let mut candidates: Vec<CandidateRelation> = svos
        .map(|e| e.svos.as_slice())
        .unwrap_or(&[])
        .iter()
        .map(|s| CandidateRelation {
            subj_id: s.subj.clone(),
            pred: s.verb.clone(),
            obj_id: s.obj.clone(),
            evidence: Some(s.sent_text.clone()),
        })
        .collect();

    for item in llm_re {
        let Some(resp) = item.resp.value() else {
            continue;
        };
        for ex in resp.extracted() {
            // Incomplete extractions cannot form a triple
            let (Some(subj), Some(pred), Some(obj)) = (ex.subj, ex.pred, ex.obj) else {
                continue;
            };
            candidates.push(CandidateRelation {
                subj_id: subj,
                pred,
                obj_id: obj,
                evidence: ex.evidence.first().map(String::from),
            });
        }
    }

    candidates
}
