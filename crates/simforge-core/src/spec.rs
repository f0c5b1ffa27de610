//! Specification ingestion.
//!
//! A [`SpecRecord`] describes the concept a run generates a simulation
//! for. It is loaded once per run and never mutated. Ingestion is the
//! only fatal boundary in the system: a missing file, malformed JSON or
//! an empty concept name aborts before any stage runs.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when loading a specification.
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("Failed to read spec file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// The immutable input specification for one generation run.
///
/// On-disk spec files historically use capitalized keys (`"Concept"`,
/// `"Topics"`, ...); both spellings are accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecRecord {
    /// Name of the concept to simulate
    #[serde(alias = "Concept")]
    pub concept: String,

    /// Short description of the concept
    #[serde(default, alias = "Description")]
    pub description: String,

    /// Ordered topic list the simulation should cover
    #[serde(default, alias = "Topics")]
    pub topics: Vec<String>,

    /// Working-principle statements
    #[serde(default, alias = "Working_Principles", alias = "WorkingPrinciples")]
    pub working_principles: Vec<String>,

    /// Real-world application statements
    #[serde(default, alias = "Applications")]
    pub applications: Vec<String>,

    /// Seed questions for the learning-materials stage
    #[serde(default, alias = "Questions", alias = "Question_Seeds")]
    pub question_seeds: Vec<String>,
}

impl SpecRecord {
    /// Parse a specification from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SpecError> {
        let spec: SpecRecord = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Parse a specification from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SpecError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    fn validate(&self) -> Result<(), SpecError> {
        if self.concept.trim().is_empty() {
            return Err(SpecError::MissingField("concept".to_string()));
        }
        Ok(())
    }

    /// Pretty-printed JSON rendering used when building stage prompts.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_capitalized_keys() {
        let json = r#"{
            "Concept": "Heat Transfer",
            "Description": "How heat moves through materials",
            "Topics": ["Conduction", "Convection", "Radiation"]
        }"#;
        let spec = SpecRecord::from_json(json).unwrap();
        assert_eq!(spec.concept, "Heat Transfer");
        assert_eq!(spec.topics.len(), 3);
        assert!(spec.question_seeds.is_empty());
    }

    #[test]
    fn test_parse_snake_case_keys() {
        let json = r#"{
            "concept": "Photosynthesis",
            "description": "",
            "topics": [],
            "question_seeds": ["What do plants need to grow?"]
        }"#;
        let spec = SpecRecord::from_json(json).unwrap();
        assert_eq!(spec.concept, "Photosynthesis");
        assert_eq!(spec.question_seeds.len(), 1);
    }

    #[test]
    fn test_empty_concept_rejected() {
        let json = r#"{"Concept": "  "}"#;
        let result = SpecRecord::from_json(json);
        assert!(matches!(result, Err(SpecError::MissingField(_))));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let result = SpecRecord::from_json("not json at all");
        assert!(matches!(result, Err(SpecError::JsonError(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = SpecRecord::from_json_file("/nonexistent/spec.json");
        assert!(matches!(result, Err(SpecError::IoError(_))));
    }
}
