//! Structured wire shapes produced by generation stages.
//!
//! Every field of a stage payload is lenient: absent, null and
//! wrong-typed values all collapse to the field's default, so
//! downstream code never branches on absence versus null versus wrong
//! type. Unknown extra fields are ignored.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Deserialize a field leniently: any value that does not match the
/// target type (including null) becomes the default.
fn lenient<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(T::deserialize(de).unwrap_or_default())
}

/// A variable the simulation lets the learner control.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimVariable {
    pub name: String,

    /// Control element driving the variable (slider, button, toggle)
    #[serde(default = "default_control", alias = "control_type")]
    pub control: String,

    #[serde(default, deserialize_with = "lenient")]
    pub min: f64,

    #[serde(default = "default_max")]
    pub max: f64,

    #[serde(default, deserialize_with = "lenient")]
    pub default: f64,

    #[serde(default, deserialize_with = "lenient")]
    pub unit: String,
}

fn default_control() -> String {
    "slider".to_string()
}

fn default_max() -> f64 {
    100.0
}

/// Named controls and their effect descriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserInteractions {
    #[serde(default, deserialize_with = "lenient")]
    pub sliders: Vec<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub buttons: Vec<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub other: String,
}

/// Mobile layout plan for the generated document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MobileUiPlan {
    #[serde(default, deserialize_with = "lenient")]
    pub layout: String,

    #[serde(default, deserialize_with = "lenient")]
    pub sections: Vec<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub touch_targets: String,
}

/// The plan stage output: a structured blueprint the creation stage
/// renders into a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Blueprint {
    #[serde(default, deserialize_with = "lenient")]
    pub learning_objectives: Vec<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub key_concepts: Vec<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub variables_to_simulate: Vec<SimVariable>,

    #[serde(default, deserialize_with = "lenient")]
    pub user_interactions: UserInteractions,

    #[serde(default, deserialize_with = "lenient")]
    pub simulation_logic: Vec<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub mobile_ui_plan: MobileUiPlan,

    #[serde(default, deserialize_with = "lenient")]
    pub misconceptions_to_address: Vec<String>,

    #[serde(
        default,
        deserialize_with = "lenient",
        alias = "text_instructions_for_students"
    )]
    pub text_instructions: String,

    #[serde(default, deserialize_with = "lenient")]
    pub safety_constraints: Vec<String>,
}

impl Blueprint {
    /// Deserialize from an extracted structured payload.
    ///
    /// Shape problems never fail this conversion; in the worst case
    /// every field holds its default.
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(payload.clone())).unwrap_or_default()
    }

    /// Pretty-printed JSON rendering used when building stage prompts.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Wire shape of the fix stage: a success flag, the corrected markup
/// and an ordered list of explanation strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixResult {
    #[serde(default, deserialize_with = "lenient")]
    pub fixed: bool,

    #[serde(default, rename = "index.html", alias = "html")]
    pub index_html: Option<String>,

    #[serde(default, deserialize_with = "lenient", alias = "changes_made")]
    pub explanations: Vec<String>,
}

impl FixResult {
    /// Deserialize from an extracted structured payload, defaulting any
    /// missing field.
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(payload.clone())).unwrap_or_default()
    }
}

/// A single multiple-choice question in the learning-materials set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub question: String,

    #[serde(default, deserialize_with = "lenient")]
    pub options: Vec<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub correct_index: usize,

    #[serde(default, deserialize_with = "lenient")]
    pub hint: String,

    #[serde(default, deserialize_with = "lenient")]
    pub explanation: String,
}

/// The learning-materials stage output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InteractionSet {
    #[serde(default, deserialize_with = "lenient")]
    pub intro: String,

    #[serde(default, deserialize_with = "lenient")]
    pub questions: Vec<Question>,

    #[serde(default, deserialize_with = "lenient")]
    pub followups: Vec<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub summary: String,
}

impl InteractionSet {
    /// Deserialize from an extracted structured payload, defaulting any
    /// missing field.
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(payload.clone())).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default_to_empty() {
        let payload: Map<String, Value> =
            serde_json::from_str(r#"{"learning_objectives": ["obj 1"]}"#).unwrap();
        let bp = Blueprint::from_payload(&payload);
        assert_eq!(bp.learning_objectives, vec!["obj 1"]);
        assert!(bp.key_concepts.is_empty());
        assert!(bp.variables_to_simulate.is_empty());
        assert_eq!(bp.text_instructions, "");
    }

    #[test]
    fn test_null_field_collapses_without_losing_others() {
        let payload: Map<String, Value> = serde_json::from_str(
            r#"{"key_concepts": null, "simulation_logic": ["step 1"]}"#,
        )
        .unwrap();
        let bp = Blueprint::from_payload(&payload);
        assert!(bp.key_concepts.is_empty());
        assert_eq!(bp.simulation_logic, vec!["step 1"]);
    }

    #[test]
    fn test_wrong_typed_field_collapses() {
        let payload: Map<String, Value> =
            serde_json::from_str(r#"{"misconceptions_to_address": "not a list"}"#).unwrap();
        let bp = Blueprint::from_payload(&payload);
        assert!(bp.misconceptions_to_address.is_empty());
    }

    #[test]
    fn test_variable_aliases_and_defaults() {
        let json = r#"{
            "variables_to_simulate": [
                {"name": "Temperature", "control_type": "slider", "min": 0, "max": 100, "unit": "C"}
            ]
        }"#;
        let bp: Blueprint = serde_json::from_str(json).unwrap();
        let v = &bp.variables_to_simulate[0];
        assert_eq!(v.control, "slider");
        assert_eq!(v.max, 100.0);
        assert_eq!(v.default, 0.0);
    }

    #[test]
    fn test_fix_result_aliases() {
        let json =
            r#"{"fixed": true, "index.html": "<p>x</p>", "explanations": ["added viewport"]}"#;
        let fix: FixResult = serde_json::from_str(json).unwrap();
        assert!(fix.fixed);
        assert_eq!(fix.index_html.as_deref(), Some("<p>x</p>"));
        assert_eq!(fix.explanations.len(), 1);

        let json = r#"{"html": "<p>y</p>", "changes_made": ["recolored"]}"#;
        let fix: FixResult = serde_json::from_str(json).unwrap();
        assert_eq!(fix.index_html.as_deref(), Some("<p>y</p>"));
        assert_eq!(fix.explanations, vec!["recolored"]);
    }

    #[test]
    fn test_interaction_set_defaults() {
        let payload: Map<String, Value> =
            serde_json::from_str(r#"{"intro": "Welcome!"}"#).unwrap();
        let set = InteractionSet::from_payload(&payload);
        assert_eq!(set.intro, "Welcome!");
        assert!(set.questions.is_empty());
    }
}
