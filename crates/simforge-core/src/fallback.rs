//! Deterministic fallback synthesis.
//!
//! When generation and every extraction attempt fail, a stage still has
//! to hand a valid artifact downstream. The synthesizers here build a
//! minimally useful artifact from the immutable specification alone:
//! same spec in, byte-identical artifact out, and never a call to the
//! generation collaborator.

use crate::blueprint::{
    Blueprint, InteractionSet, MobileUiPlan, Question, SimVariable, UserInteractions,
};
use crate::spec::SpecRecord;

/// Cap on objectives derived from the topic list.
const MAX_OBJECTIVES: usize = 5;

/// Cap on fallback questions derived from the question seeds.
const MAX_QUESTIONS: usize = 3;

/// Fixed boilerplate safety constraints for every fallback blueprint.
const SAFETY_BOILERPLATE: &[&str] = &[
    "Age-appropriate language throughout",
    "No external links or resources",
    "No personal-data collection",
];

/// Build a minimally valid blueprint from the specification.
pub fn blueprint(spec: &SpecRecord) -> Blueprint {
    let concept = spec.concept.as_str();

    let learning_objectives: Vec<String> = if spec.topics.is_empty() {
        vec![
            format!("Understand what {concept} means."),
            "See how changing one variable affects the outcome.".to_string(),
        ]
    } else {
        spec.topics
            .iter()
            .take(MAX_OBJECTIVES)
            .map(|topic| format!("Understand {topic} and observe it in the simulation."))
            .collect()
    };

    let variables = default_variables(spec);
    let sliders = variables
        .iter()
        .filter(|v| v.control == "slider")
        .map(|v| format!("Slider to set {}", v.name))
        .collect();

    Blueprint {
        learning_objectives,
        key_concepts: spec.topics.clone(),
        variables_to_simulate: variables,
        user_interactions: UserInteractions {
            sliders,
            buttons: vec!["Start simulation".to_string(), "Reset to defaults".to_string()],
            other: String::new(),
        },
        simulation_logic: vec![
            "Step 1: Read current values of controls.".to_string(),
            "Step 2: Update the visual area to reflect the new values.".to_string(),
            "Step 3: If Start pressed, animate changes over time.".to_string(),
        ],
        mobile_ui_plan: MobileUiPlan {
            layout: "vertical single column".to_string(),
            sections: vec![
                "Header".to_string(),
                "Instructions".to_string(),
                "Simulation area".to_string(),
                "Controls".to_string(),
            ],
            touch_targets: "minimum 48px".to_string(),
        },
        misconceptions_to_address: Vec::new(),
        text_instructions: format!(
            "{} Use the sliders and Start button to explore.",
            truncate(&spec.description, 200)
        ),
        safety_constraints: SAFETY_BOILERPLATE.iter().map(|s| s.to_string()).collect(),
    }
}

/// One placeholder variable unless the specification hints at a quantity.
fn default_variables(spec: &SpecRecord) -> Vec<SimVariable> {
    let haystack = format!(
        "{} {} {}",
        spec.concept.to_lowercase(),
        spec.description.to_lowercase(),
        spec.topics.join(" ").to_lowercase()
    );

    if haystack.contains("heat") || haystack.contains("temperature") {
        return vec![SimVariable {
            name: "Temperature".to_string(),
            control: "slider".to_string(),
            min: 0.0,
            max: 100.0,
            default: 25.0,
            unit: "C".to_string(),
        }];
    }

    vec![SimVariable {
        name: "Intensity".to_string(),
        control: "slider".to_string(),
        min: 0.0,
        max: 100.0,
        default: 50.0,
        unit: "%".to_string(),
    }]
}

/// Build a minimal learning-materials set from the question seeds.
pub fn interactions(spec: &SpecRecord) -> InteractionSet {
    let questions: Vec<Question> = spec
        .question_seeds
        .iter()
        .take(MAX_QUESTIONS)
        .map(|seed| Question {
            question: seed.clone(),
            options: vec![
                "A) It increases".to_string(),
                "B) It decreases".to_string(),
                "C) It stays the same".to_string(),
                "D) It depends on the other settings".to_string(),
            ],
            correct_index: 3,
            hint: "Try adjusting the controls and observe the changes.".to_string(),
            explanation: String::new(),
        })
        .collect();

    InteractionSet {
        intro: format!(
            "Explore the {} simulation and see what changes when you move the controls.",
            spec.concept
        ),
        questions,
        followups: vec![
            "Try setting every control to its maximum. What do you notice?".to_string(),
            "Challenge: predict the outcome before making changes.".to_string(),
        ],
        summary: truncate(&spec.description, 200).to_string(),
    }
}

/// A minimal, self-contained document rendered from a blueprint. Used
/// only when the creation stage produced no text at all on either
/// attempt.
pub fn placeholder_document(concept: &str, plan: &Blueprint) -> crate::document::Document {
    let objectives: String = plan
        .learning_objectives
        .iter()
        .map(|o| format!("        <li>{o}</li>\n"))
        .collect();

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{concept} - Interactive Simulation</title>
    <style>
        body {{ font-family: sans-serif; margin: 0; color: #333; }}
        #app {{ max-width: 600px; margin: 0 auto; padding: 16px; }}
        button {{ min-height: 48px; width: 100%; font-size: 16px; }}
        input[type="range"] {{ width: 100%; height: 44px; }}
    </style>
</head>
<body>
    <div id="app">
        <h1>{concept}</h1>
        <p>{instructions}</p>
        <ul>
{objectives}        </ul>
        <label>Adjust: <input type="range" id="control" min="0" max="100" value="50"></label>
        <button id="reset">Reset</button>
        <p id="value">50</p>
    </div>
    <script>
        const control = document.getElementById('control');
        const value = document.getElementById('value');
        control.addEventListener('input', (e) => {{ value.textContent = e.target.value; }});
        document.getElementById('reset').addEventListener('click', () => {{
            control.value = 50;
            value.textContent = '50';
        }});
    </script>
</body>
</html>"#,
        concept = concept,
        instructions = plan.text_instructions,
        objectives = objectives,
    );

    crate::document::Document::new(html)
}

/// Truncate on a char boundary without allocating when short enough.
fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> SpecRecord {
        SpecRecord::from_json(
            r#"{
                "Concept": "Heat Transfer",
                "Description": "How heat moves through materials.",
                "Topics": ["Conduction", "Convection", "Radiation"],
                "Questions": ["What happens when the temperature rises?"]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_blueprint_is_deterministic() {
        let spec = spec();
        let a = blueprint(&spec);
        let b = blueprint(&spec);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_no_field_is_absent() {
        let bp = blueprint(&spec());
        assert!(!bp.learning_objectives.is_empty());
        assert!(!bp.key_concepts.is_empty());
        assert!(!bp.variables_to_simulate.is_empty());
        assert!(!bp.user_interactions.buttons.is_empty());
        assert!(!bp.simulation_logic.is_empty());
        assert!(!bp.safety_constraints.is_empty());
        assert!(!bp.text_instructions.is_empty());
    }

    #[test]
    fn test_objectives_derived_from_topics_and_capped() {
        let mut spec = spec();
        spec.topics = (1..=8).map(|i| format!("Topic {i}")).collect();
        let bp = blueprint(&spec);
        assert_eq!(bp.learning_objectives.len(), MAX_OBJECTIVES);
        assert!(bp.learning_objectives[0].contains("Topic 1"));
    }

    #[test]
    fn test_key_concepts_mirror_topics() {
        let spec = spec();
        let bp = blueprint(&spec);
        assert_eq!(bp.key_concepts, spec.topics);
    }

    #[test]
    fn test_temperature_variable_for_heat_concepts() {
        let bp = blueprint(&spec());
        assert_eq!(bp.variables_to_simulate[0].name, "Temperature");
    }

    #[test]
    fn test_placeholder_variable_without_hints() {
        let spec = SpecRecord::from_json(r#"{"Concept": "Food Chains"}"#).unwrap();
        let bp = blueprint(&spec);
        assert_eq!(bp.variables_to_simulate.len(), 1);
        assert_eq!(bp.variables_to_simulate[0].name, "Intensity");
    }

    #[test]
    fn test_interactions_use_question_seeds() {
        let set = interactions(&spec());
        assert_eq!(set.questions.len(), 1);
        assert!(set.questions[0].question.contains("temperature rises"));
        assert_eq!(set.questions[0].options.len(), 4);
    }

    #[test]
    fn test_placeholder_document_is_structurally_valid() {
        let spec = spec();
        let doc = placeholder_document(&spec.concept, &blueprint(&spec));
        assert!(doc.violations().is_empty());
    }
}
