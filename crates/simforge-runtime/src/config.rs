//! Pipeline configuration.
//!
//! Model name, per-stage temperature and the optional-stage switches
//! are an explicit value handed to the controller at construction.
//! Nothing in extraction or validation reads ambient state.

use std::time::Duration;

use crate::pipeline::Stage;
use crate::providers::GenerationParams;

/// Generation settings for one stage.
#[derive(Debug, Clone)]
pub struct StageSettings {
    /// Model to use
    pub model: String,

    /// Sampling temperature (a stage-level constant)
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl StageSettings {
    pub fn params(&self, timeout: Duration) -> GenerationParams {
        GenerationParams {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout,
        }
    }
}

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub plan: StageSettings,
    pub create: StageSettings,
    pub fix: StageSettings,
    pub interact: StageSettings,
    pub feedback: StageSettings,
    pub review: StageSettings,

    /// Run the learning-materials stage (independent of the markup
    /// chain; skipping it affects nothing downstream).
    pub interactions_enabled: bool,

    /// Feedback text for the optional feedback-incorporation stage;
    /// the stage is skipped when this is `None`.
    pub feedback_text: Option<String>,

    /// Upper bound on controller passes when the caller opts into
    /// revision via `run_with_revisions`. 1 means a single pass and no
    /// automatic loop.
    pub max_passes: u32,

    /// Per-call timeout passed through to the provider.
    pub call_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let model = "kwaipilot/kat-coder-pro:free".to_string();
        let stage = |temperature: f32| StageSettings {
            model: model.clone(),
            temperature,
            max_tokens: 8192,
        };

        Self {
            plan: stage(0.3),
            create: stage(0.0),
            fix: stage(0.2),
            interact: stage(0.6),
            feedback: stage(0.2),
            review: stage(0.1),
            interactions_enabled: true,
            feedback_text: None,
            max_passes: 1,
            call_timeout: Duration::from_secs(120),
        }
    }
}

impl PipelineConfig {
    /// Use one model for every stage.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        for settings in [
            &mut self.plan,
            &mut self.create,
            &mut self.fix,
            &mut self.interact,
            &mut self.feedback,
            &mut self.review,
        ] {
            settings.model = model.clone();
        }
        self
    }

    /// Settings for a given stage.
    pub fn settings(&self, stage: Stage) -> &StageSettings {
        match stage {
            Stage::Plan => &self.plan,
            Stage::Create => &self.create,
            Stage::Fix => &self.fix,
            Stage::Interact => &self.interact,
            Stage::Feedback => &self.feedback,
            Stage::Review => &self.review,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_temperatures() {
        let config = PipelineConfig::default();
        assert_eq!(config.plan.temperature, 0.3);
        assert_eq!(config.create.temperature, 0.0);
        assert_eq!(config.review.temperature, 0.1);
        assert_eq!(config.max_passes, 1);
    }

    #[test]
    fn test_with_model_applies_everywhere() {
        let config = PipelineConfig::default().with_model("test/model");
        assert_eq!(config.plan.model, "test/model");
        assert_eq!(config.review.model, "test/model");
    }

    #[test]
    fn test_settings_lookup() {
        let config = PipelineConfig::default();
        assert_eq!(
            config.settings(Stage::Interact).temperature,
            config.interact.temperature
        );
    }
}
