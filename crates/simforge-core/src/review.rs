//! Review stage record and pass derivation.
//!
//! `pass` is never taken from the wire: it is always derived from the
//! six scores as `min(scores) >= 3 && mean(scores) >= 4.0`. A model
//! claiming `"pass": true` with failing scores does not pass.

use serde::{Deserialize, Deserializer, Serialize};

/// Minimum acceptable individual score.
const MIN_SCORE: u8 = 3;

/// Minimum acceptable mean score.
const MIN_AVERAGE: f64 = 4.0;

/// Clamp an incoming score into [0, 5]; anything unreadable becomes 0.
fn score<'de, D>(de: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(de).unwrap_or(0.0);
    Ok(raw.clamp(0.0, 5.0) as u8)
}

fn list<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Vec::deserialize(de).unwrap_or_default())
}

/// Six named integer scores in [0, 5].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scores {
    #[serde(default, deserialize_with = "score")]
    pub pedagogical_clarity: u8,

    #[serde(default, deserialize_with = "score")]
    pub conceptual_correctness: u8,

    #[serde(default, deserialize_with = "score")]
    pub mobile_responsiveness: u8,

    #[serde(default, deserialize_with = "score")]
    pub interactivity_quality: u8,

    #[serde(default, deserialize_with = "score")]
    pub code_reliability: u8,

    #[serde(default, deserialize_with = "score")]
    pub safety_age_appropriateness: u8,
}

impl Scores {
    pub fn as_array(&self) -> [u8; 6] {
        [
            self.pedagogical_clarity,
            self.conceptual_correctness,
            self.mobile_responsiveness,
            self.interactivity_quality,
            self.code_reliability,
            self.safety_age_appropriateness,
        ]
    }

    pub fn min(&self) -> u8 {
        self.as_array().into_iter().min().unwrap_or(0)
    }

    pub fn mean(&self) -> f64 {
        let total: u32 = self.as_array().iter().map(|&s| u32::from(s)).sum();
        f64::from(total) / 6.0
    }

    /// Named (criterion, score) pairs in stable order, for reporting.
    pub fn named(&self) -> [(&'static str, u8); 6] {
        [
            ("pedagogical_clarity", self.pedagogical_clarity),
            ("conceptual_correctness", self.conceptual_correctness),
            ("mobile_responsiveness", self.mobile_responsiveness),
            ("interactivity_quality", self.interactivity_quality),
            ("code_reliability", self.code_reliability),
            ("safety_age_appropriateness", self.safety_age_appropriateness),
        ]
    }
}

/// Earlier stage a review may advise revisiting. Advisory only: the
/// controller records it but never acts on it within a single pass.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReturnTo {
    #[default]
    None,

    #[serde(alias = "bugfix")]
    Fix,

    #[serde(alias = "creation")]
    Create,

    #[serde(alias = "planner")]
    Plan,
}

fn return_to<'de, D>(de: D) -> Result<ReturnTo, D::Error>
where
    D: Deserializer<'de>,
{
    // An unrecognized stage name degrades to None rather than failing
    // the whole review payload.
    Ok(ReturnTo::deserialize(de).unwrap_or_default())
}

/// The review stage output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Review {
    #[serde(default)]
    pub scores: Scores,

    #[serde(default, deserialize_with = "list")]
    pub strengths: Vec<String>,

    #[serde(default, deserialize_with = "list")]
    pub required_changes: Vec<String>,

    #[serde(default, deserialize_with = "list")]
    pub optional_improvements: Vec<String>,

    #[serde(default, deserialize_with = "return_to")]
    pub return_to: ReturnTo,
}

impl Review {
    /// Deserialize from an extracted structured payload.
    ///
    /// Any `pass` or `average_score` field on the wire is ignored;
    /// both are derived.
    pub fn from_payload(payload: &serde_json::Map<String, serde_json::Value>) -> Self {
        serde_json::from_value(serde_json::Value::Object(payload.clone())).unwrap_or_default()
    }

    /// Derived pass verdict.
    pub fn pass(&self) -> bool {
        self.scores.min() >= MIN_SCORE && self.scores.mean() >= MIN_AVERAGE
    }
}
