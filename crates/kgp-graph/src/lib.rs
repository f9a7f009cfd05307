//! KGP Graph - Knowledge graph construction
//!
//! Builds a directed multigraph from canonical entities and relations and
//! exports it as a small, human-readable JSON-LD document.

use std::collections::HashMap;
use std::path::Path;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use kgp_core::{write_json_pretty, CanonicalEntity, RelationTriple, Result};

/// Vocabulary prefix written to `@context`
pub const KG_NAMESPACE: &str = "http://example.org/kg#";

// ============================================================================
// Graph
// ============================================================================

/// Node attributes
#[derive(Debug, Clone, PartialEq)]
pub struct EntityNode {
    pub id: String,
    pub text: Option<String>,
    pub entity_type: Option<String>,
}

/// Knowledge graph keyed by entity id
///
/// Parallel edges are allowed: the same pair may be linked by several
/// predicates, or by the same predicate more than once.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: DiGraph<EntityNode, String>,
    index: HashMap<String, NodeIndex>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from entities and relations
    ///
    /// Relation endpoints that are not in `entities` become bare nodes.
    pub fn build(entities: &[CanonicalEntity], relations: &[RelationTriple]) -> Self {
        let mut kg = Self::new();
        for entity in entities {
            kg.add_entity(entity);
        }
        for relation in relations {
            kg.add_relation(relation);
        }
        tracing::debug!(
            "Built knowledge graph: {} nodes, {} edges",
            kg.node_count(),
            kg.edge_count()
        );
        kg
    }

    /// Add an entity, updating attributes if the id already exists
    pub fn add_entity(&mut self, entity: &CanonicalEntity) -> NodeIndex {
        let idx = self.node(&entity.id);
        let node = &mut self.graph[idx];
        node.text = Some(entity.text.clone());
        node.entity_type = entity.entity_type.clone();
        idx
    }

    /// Add an edge `subj --pred--> obj`
    pub fn add_relation(&mut self, relation: &RelationTriple) {
        let subj = self.node(&relation.subj_id);
        let obj = self.node(&relation.obj_id);
        self.graph.add_edge(subj, obj, relation.pred.clone());
    }

    fn node(&mut self, id: &str) -> NodeIndex {
        if let Some(idx) = self.index.get(id) {
            return *idx;
        }
        let idx = self.graph.add_node(EntityNode {
            id: id.to_string(),
            text: None,
            entity_type: None,
        });
        self.index.insert(id.to_string(), idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Outgoing `(predicate, object id)` pairs of a node
    pub fn neighbors(&self, id: &str) -> Vec<(&str, &str)> {
        let Some(idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<(&str, &str)> = self
            .graph
            .edges(*idx)
            .map(|e| (e.weight().as_str(), self.graph[e.target()].id.as_str()))
            .collect();
        // petgraph walks edges newest first
        out.reverse();
        out
    }

    /// Export as JSON-LD; nodes and edges keep insertion order
    pub fn to_jsonld(&self) -> JsonLdDocument {
        let nodes = self
            .graph
            .node_indices()
            .map(|idx| {
                let node = &self.graph[idx];
                JsonLdNode {
                    id: node.id.clone(),
                    node_type: node.entity_type.clone(),
                    label: node.text.clone(),
                }
            })
            .collect();

        let edges = self
            .graph
            .edge_references()
            .map(|e| JsonLdEdge {
                edge_type: e.weight().clone(),
                subj: self.graph[e.source()].id.clone(),
                obj: self.graph[e.target()].id.clone(),
            })
            .collect();

        JsonLdDocument {
            context: JsonLdContext {
                ex: KG_NAMESPACE.to_string(),
            },
            graph: JsonLdGraph { nodes, edges },
        }
    }
}

// ============================================================================
// JSON-LD
// ============================================================================

/// `{"@context": {...}, "@graph": {"nodes": [...], "edges": [...]}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonLdDocument {
    #[serde(rename = "@context")]
    pub context: JsonLdContext,
    #[serde(rename = "@graph")]
    pub graph: JsonLdGraph,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonLdContext {
    pub ex: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonLdGraph {
    pub nodes: Vec<JsonLdNode>,
    pub edges: Vec<JsonLdEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonLdNode {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub node_type: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonLdEdge {
    #[serde(rename = "@type")]
    pub edge_type: String,
    pub subj: String,
    pub obj: String,
}

/// Write a JSON-LD document, pretty-printed
pub fn save_jsonld(path: impl AsRef<Path>, doc: &JsonLdDocument) -> Result<()> {
    write_json_pretty(path, doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str, text: &str, entity_type: &str) -> CanonicalEntity {
        CanonicalEntity {
            id: id.to_string(),
            text: text.to_string(),
            entity_type: Some(entity_type.to_string()),
        }
    }

    fn sample() -> KnowledgeGraph {
        KnowledgeGraph::build(
            &[
                entity("D1_E1", "Alice", "Person"),
                entity("D1_E2", "Acme Corp", "Organization"),
            ],
            &[
                RelationTriple::new("D1_E1", "worksAt", "D1_E2"),
                RelationTriple::new("D1_E1", "hasRole", "project manager"),
                RelationTriple::new("D1_E1", "worksAt", "D1_E2"),
            ],
        )
    }

    #[test]
    fn test_build_adds_bare_endpoints() {
        let kg = sample();
        assert_eq!(kg.node_count(), 3);
        assert_eq!(kg.edge_count(), 3);
        assert!(kg.contains("project manager"));
        assert_eq!(
            kg.neighbors("D1_E1"),
            vec![
                ("worksAt", "D1_E2"),
                ("hasRole", "project manager"),
                ("worksAt", "D1_E2")
            ]
        );
        assert!(kg.neighbors("missing").is_empty());
    }

    #[test]
    fn test_duplicate_entity_updates_attributes() {
        let kg = KnowledgeGraph::build(
            &[entity("E1", "Alice", "Person"), entity("E1", "Alice Wong", "Person")],
            &[],
        );
        assert_eq!(kg.node_count(), 1);
        assert_eq!(kg.to_jsonld().graph.nodes[0].label.as_deref(), Some("Alice Wong"));
    }

    #[test]
    fn test_jsonld_shape() {
        let value = serde_json::to_value(sample().to_jsonld()).unwrap();

        assert_eq!(value["@context"]["ex"], KG_NAMESPACE);
        assert_eq!(
            value["@graph"]["nodes"][0],
            serde_json::json!({"@id": "D1_E1", "@type": "Person", "label": "Alice"})
        );
        assert_eq!(
            value["@graph"]["nodes"][2],
            serde_json::json!({"@id": "project manager", "@type": null, "label": null})
        );
        assert_eq!(
            value["@graph"]["edges"][1],
            serde_json::json!({"@type": "hasRole", "subj": "D1_E1", "obj": "project manager"})
        );
    }

    #[test]
    fn test_save_jsonld() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kg/doc.jsonld");
        let doc = sample().to_jsonld();

        save_jsonld(&path, &doc).unwrap();
        let back: JsonLdDocument = kgp_core::read_json(&path).unwrap();
        assert_eq!(back, doc);
    }
}
