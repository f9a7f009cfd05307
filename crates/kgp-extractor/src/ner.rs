//! Named Entity Recognition (NER) module
//!
//! Rule-based recognizer for the short biographical texts of the corpus:
//! - Regex patterns for people, organizations, dates and durations
//! - A role dictionary (job titles)
//!
//! Overlapping matches are resolved by confidence, then by length.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{EntityExtractor, ExtractedEntity};
use kgp_core::Result;

// ============================================================================
// Entity Labels
// ============================================================================

/// Entity labels produced by the recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityLabel {
    Person,
    Organization,
    Role,
    Date,
    Duration,
}

impl EntityLabel {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "Person",
            Self::Organization => "Organization",
            Self::Role => "Role",
            Self::Date => "Date",
            Self::Duration => "Duration",
        }
    }

    /// Labels that can take part in a relation
    pub fn is_relational(label: &str) -> bool {
        matches!(label, "Person" | "Organization" | "Role")
    }
}

impl std::fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Organization name suffixes
pub const ORG_SUFFIXES: &[&str] = &[
    "Corp",
    "Labs",
    "Bank",
    "Solutions",
    "Telecom",
    "Studios",
    "Inc",
    "Ltd",
    "Group",
    "University",
    "Institute",
    "Foundation",
];

/// Personal pronouns used to chain sentences to the last mentioned person
pub const PRONOUNS: &[&str] = &["He", "She", "They", "His", "Her", "Their", "Him", "Them"];

/// Capitalized words that start a sentence without being part of a name
const LEADING_STOPWORDS: &[&str] = &[
    "The", "A", "An", "Then", "In", "At", "On", "After", "Before", "Later", "When", "While",
    "Last", "Next", "This", "That", "Yesterday", "Today", "Meanwhile", "However", "Also", "And",
    "But", "During", "Since", "Recently", "Eventually", "Finally",
];

const CALENDAR_WORDS: &[&str] = &[
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Job titles recognized as `Role`
const ROLE_TERMS: &[&str] = &[
    "project manager",
    "product manager",
    "software engineer",
    "data scientist",
    "engineer",
    "manager",
    "designer",
    "analyst",
    "director",
    "consultant",
    "researcher",
    "developer",
    "scientist",
    "accountant",
    "professor",
    "nurse",
    "volunteer",
    "mentor",
    "intern",
    "ceo",
    "cto",
    "cfo",
];

// ============================================================================
// Rule-based NER
// ============================================================================

/// One recognition rule
struct PatternRule {
    regex: Regex,
    label: EntityLabel,
    confidence: f32,
}

/// Rule-based NER using regex patterns and a role dictionary
pub struct RuleBasedNer {
    patterns: Vec<PatternRule>,
    stopwords: HashSet<&'static str>,
}

impl RuleBasedNer {
    /// Create a recognizer with the default rules
    pub fn new() -> Self {
        let mut ner = Self {
            patterns: Vec::new(),
            stopwords: LEADING_STOPWORDS.iter().copied().collect(),
        };

        ner.init_patterns();
        ner.init_role_dictionary();
        ner
    }

    fn init_patterns(&mut self) {
        // People
        self.add_pattern(
            r"\b(?:Dr|Mr|Mrs|Ms|Prof)\.[ \t]+[A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+)?",
            EntityLabel::Person,
            0.9,
        );
        self.add_pattern(
            r"\b[A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+){0,2}\b",
            EntityLabel::Person,
            0.6,
        );

        // Organizations
        let suffixes = ORG_SUFFIXES.join("|");
        self.add_pattern(
            &format!(r"\b(?:[A-Z][\w&-]*[ \t]+){{0,3}}(?:{suffixes})\b"),
            EntityLabel::Organization,
            0.85,
        );
        self.add_pattern(
            &format!(r"\b[A-Z][A-Za-z]*(?:{suffixes})\b"),
            EntityLabel::Organization,
            0.8,
        );

        // Dates
        let months = CALENDAR_WORDS[..12].join("|");
        self.add_pattern(
            &format!(r"\b(?:{months})[ \t]+\d{{1,2}}(?:,[ \t]*\d{{4}})?\b"),
            EntityLabel::Date,
            0.95,
        );
        self.add_pattern(r"\b\d{4}-\d{2}-\d{2}\b", EntityLabel::Date, 0.95);
        self.add_pattern(
            r"\b(?:last|next|this)[ \t]+(?:week|month|year|quarter)\b",
            EntityLabel::Date,
            0.8,
        );
        self.add_pattern(r"\b(?:19|20)\d{2}\b", EntityLabel::Date, 0.7);

        // Durations
        self.add_pattern(
            r"\b\d+[ \t]+(?:days?|weeks?|months?|years?)\b",
            EntityLabel::Duration,
            0.9,
        );
    }

    fn init_role_dictionary(&mut self) {
        // Longest terms first so "project manager" wins over "manager"
        let mut terms: Vec<&str> = ROLE_TERMS.to_vec();
        terms.sort_by_key(|t| std::cmp::Reverse(t.len()));
        let alternatives = terms
            .iter()
            .map(|t| t.replace(' ', r"[ \t]+"))
            .collect::<Vec<_>>()
            .join("|");
        self.add_pattern(
            &format!(r"(?i)\b(?:(?:senior|junior|lead)[ \t]+)?(?:{alternatives})\b"),
            EntityLabel::Role,
            0.9,
        );
    }

    /// Add a regex pattern; invalid patterns are skipped
    fn add_pattern(&mut self, pattern: &str, label: EntityLabel, confidence: f32) {
        match Regex::new(pattern) {
            Ok(regex) => self.patterns.push(PatternRule {
                regex,
                label,
                confidence,
            }),
            Err(e) => tracing::warn!("Skipping invalid NER pattern {pattern:?}: {e}"),
        }
    }

    /// Extract candidate mentions from every pattern
    fn extract_by_patterns(&self, text: &str) -> Vec<ExtractedEntity> {
        let mut entities = Vec::new();

        for rule in &self.patterns {
            for mat in rule.regex.find_iter(text) {
                let (start, surface) = match rule.label {
                    EntityLabel::Person | EntityLabel::Organization => {
                        self.trim_leading_stopwords(mat.start(), mat.as_str())
                    }
                    _ => (mat.start(), mat.as_str()),
                };
                if surface.is_empty() {
                    continue;
                }
                if rule.label == EntityLabel::Person && !self.is_plausible_name(surface) {
                    continue;
                }
                entities.push(ExtractedEntity {
                    text: surface.to_string(),
                    start,
                    end: start + surface.len(),
                    entity_type: rule.label.to_string(),
                    confidence: rule.confidence,
                });
            }
        }

        entities
    }

    /// Drop capitalized sentence openers such as "Then" or "The"
    fn trim_leading_stopwords<'a>(
        &self,
        mut start: usize,
        mut surface: &'a str,
    ) -> (usize, &'a str) {
        loop {
            let word_end = surface
                .find(char::is_whitespace)
                .unwrap_or(surface.len());
            let word = &surface[..word_end];
            if !self.stopwords.contains(word) || word_end == surface.len() {
                break;
            }
            let rest = surface[word_end..].trim_start();
            start += surface.len() - rest.len();
            surface = rest;
        }
        if self.stopwords.contains(surface) {
            return (start, "");
        }
        (start, surface)
    }

    fn is_plausible_name(&self, surface: &str) -> bool {
        let mut words = surface.split_whitespace();
        let Some(first) = words.next() else {
            return false;
        };
        if PRONOUNS.contains(&first) || CALENDAR_WORDS.contains(&first) {
            return false;
        }
        !surface
            .split_whitespace()
            .any(|w| ORG_SUFFIXES.contains(&w) || CALENDAR_WORDS.contains(&w))
    }

    /// Remove overlapping entities, keeping higher confidence then longer spans
    fn deduplicate(&self, mut entities: Vec<ExtractedEntity>) -> Vec<ExtractedEntity> {
        entities.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then(b.len().cmp(&a.len()))
                .then(a.start.cmp(&b.start))
        });

        let mut result: Vec<ExtractedEntity> = Vec::new();
        for entity in entities {
            if !result.iter().any(|kept| kept.overlaps(&entity)) {
                result.push(entity);
            }
        }

        result.sort_by_key(|e| e.start);
        result
    }
}

impl Default for RuleBasedNer {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityExtractor for RuleBasedNer {
    fn extract(&self, text: &str) -> Result<Vec<ExtractedEntity>> {
        let entities = self.deduplicate(self.extract_by_patterns(text));
        tracing::debug!("NER found {} entities", entities.len());
        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mentions(text: &str) -> Vec<(String, String)> {
        RuleBasedNer::new()
            .extract(text)
            .unwrap()
            .into_iter()
            .map(|e| (e.text, e.entity_type))
            .collect()
    }

    fn pair(text: &str, label: &str) -> (String, String) {
        (text.to_string(), label.to_string())
    }

    #[test]
    fn test_sample_sentence() {
        let found = mentions("Alice joined Acme Corp as a project manager last month.");
        assert_eq!(
            found,
            vec![
                pair("Alice", "Person"),
                pair("Acme Corp", "Organization"),
                pair("project manager", "Role"),
                pair("last month", "Date"),
            ]
        );
    }

    #[test]
    fn test_honorific_person() {
        let found = mentions("Dr. Smith founded Nova Labs in 2019.");
        assert!(found.contains(&pair("Dr. Smith", "Person")));
        assert!(found.contains(&pair("Nova Labs", "Organization")));
        assert!(found.contains(&pair("2019", "Date")));
    }

    #[test]
    fn test_leading_stopword_trimmed() {
        let found = mentions("Then Bob left Orion Bank. The Helix Group hired him.");
        assert!(found.contains(&pair("Bob", "Person")));
        assert!(found.contains(&pair("Orion Bank", "Organization")));
        assert!(found.contains(&pair("Helix Group", "Organization")));
    }

    #[test]
    fn test_pronouns_and_months_are_not_people() {
        let found = mentions("She moved in March 3, 2021. They stayed 2 years.");
        assert!(found.iter().all(|(_, label)| label != "Person"));
        assert!(found.contains(&pair("March 3, 2021", "Date")));
        assert!(found.contains(&pair("2 years", "Duration")));
    }

    #[test]
    fn test_results_sorted_and_disjoint() {
        let ner = RuleBasedNer::new();
        let entities = ner
            .extract("Carol Diaz consulted for BrightLabs and Vega Telecom as a senior engineer.")
            .unwrap();

        assert!(entities.windows(2).all(|w| w[0].end <= w[1].start));
        let texts: Vec<&str> = entities.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Carol Diaz", "BrightLabs", "Vega Telecom", "senior engineer"]
        );
    }

    #[test]
    fn test_label_display() {
        assert_eq!(EntityLabel::Organization.to_string(), "Organization");
        assert!(EntityLabel::is_relational("Role"));
        assert!(!EntityLabel::is_relational("Date"));
    }
}
