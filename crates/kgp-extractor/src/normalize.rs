//! Canonicalization of entities and predicates
//!
//! Surface predicates found by the extractors are mapped onto the
//! canonical relation vocabulary; entity names are cleaned of honorifics
//! and punctuation.

use std::collections::HashMap;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use kgp_core::{CanonicalEntity, GoldEntity, RelationTriple};

/// Surface predicate -> canonical predicate
pub static PREDICATE_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("joined", "worksAt"),
        ("joined_with", "worksAt"),
        ("worksAt", "worksAt"),
        ("works_at", "worksAt"),
        ("left", "leftCompany"),
        ("founded", "founded"),
        ("promotedTo", "promotedTo"),
        ("role", "hasRole"),
        ("occupation", "hasRole"),
        ("contractedWith", "contractedWith"),
        ("organizedWith", "organizedWith"),
        ("consultedFor", "consultedFor"),
        ("volunteersAt", "volunteersAt"),
        ("mentorsAt", "mentorsAt"),
        ("partneredWith", "partneredWith"),
        ("recruitedFrom", "recruitedFrom"),
    ])
});

static HONORIFIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:Dr\.|Mr\.|Mrs\.|Ms\.)\s+").expect("valid honorific regex"));
static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s\-&]").expect("valid punctuation regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Clean an entity name: drop a leading honorific and punctuation, collapse
/// whitespace. Case is preserved.
pub fn canonical_name(text: &str) -> String {
    let t = HONORIFIC.replace(text.trim(), "");
    let t = PUNCTUATION.replace_all(&t, "");
    WHITESPACE.replace_all(&t, " ").trim().to_string()
}

/// Map a surface predicate to its canonical form; unknown predicates pass through
pub fn normalize_relation(pred: &str) -> String {
    PREDICATE_MAP
        .get(pred)
        .map(|p| p.to_string())
        .unwrap_or_else(|| pred.to_string())
}

/// Clean entity names and assign `E_<n>` ids to entities without one
///
/// Also returns a map from the original text to the cleaned text.
pub fn canonicalize_entities(
    entities: &[GoldEntity],
) -> (Vec<CanonicalEntity>, IndexMap<String, String>) {
    let mut names = IndexMap::new();
    let mut out: Vec<CanonicalEntity> = Vec::with_capacity(entities.len());

    for entity in entities {
        let text = canonical_name(&entity.text);
        let id = entity
            .id
            .clone()
            .unwrap_or_else(|| format!("E_{}", out.len() + 1));
        names.insert(entity.text.clone(), text.clone());
        out.push(CanonicalEntity {
            id,
            text,
            entity_type: entity.entity_type.clone(),
        });
    }

    (out, names)
}

/// Canonical entities and relations of one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Canonicalized {
    pub entities: Vec<CanonicalEntity>,
    pub relations: Vec<RelationTriple>,
}

/// Canonicalize entities and normalize relation predicates
///
/// Subject and object ids are left as given.
pub fn canonicalize(entities: &[GoldEntity], relations: &[RelationTriple]) -> Canonicalized {
    let (entities, _) = canonicalize_entities(entities);
    let relations = relations
        .iter()
        .map(|r| {
            RelationTriple::new(
                r.subj_id.clone(),
                normalize_relation(&r.pred),
                r.obj_id.clone(),
            )
        })
        .collect();

    Canonicalized {
        entities,
        relations,
    }
}

/// Replace surface subject/object text with matching gold entity ids
///
/// Matching compares cleaned, lowercased names, then falls back to a
/// partial name that fits exactly one entity. Surfaces with no match and
/// values that already are entity ids are kept as they are.
pub fn resolve_entity_ids(
    relations: &[RelationTriple],
    entities: &[GoldEntity],
) -> Vec<RelationTriple> {
    let (canonical, _) = canonicalize_entities(entities);

    let mut lookup: HashMap<String, String> = HashMap::new();
    for (raw, entity) in entities.iter().zip(&canonical) {
        // First mention wins when two entities share a name
        lookup
            .entry(entity.text.to_lowercase())
            .or_insert_with(|| entity.id.clone());
        lookup
            .entry(raw.text.trim().to_lowercase())
            .or_insert_with(|| entity.id.clone());
    }

    let token_sets: Vec<(&str, Vec<String>)> = canonical
        .iter()
        .map(|e| (e.id.as_str(), name_tokens(&e.text)))
        .collect();

    let resolve = |surface: &str| -> String {
        lookup
            .get(&surface.trim().to_lowercase())
            .or_else(|| lookup.get(&canonical_name(surface).to_lowercase()))
            .cloned()
            .or_else(|| resolve_by_tokens(surface, &token_sets))
            .unwrap_or_else(|| surface.to_string())
    };

    relations
        .iter()
        .map(|r| RelationTriple::new(resolve(&r.subj_id), r.pred.clone(), resolve(&r.obj_id)))
        .collect()
}

fn name_tokens(text: &str) -> Vec<String> {
    canonical_name(text)
        .split_whitespace()
        .map(str::to_lowercase)
        .collect()
}

/// Id of the only entity whose name contains every token of `surface`
/// ("Carol" -> "Carol Diaz")
fn resolve_by_tokens(surface: &str, token_sets: &[(&str, Vec<String>)]) -> Option<String> {
    let tokens = name_tokens(surface);
    if tokens.is_empty() {
        return None;
    }

    let mut found: Option<&str> = None;
    for (id, names) in token_sets {
        if !tokens.iter().all(|t| names.contains(t)) {
            continue;
        }
        match found {
            Some(prev) if prev != *id => return None,
            _ => found = Some(*id),
        }
    }
    found.map(String::from)
}
