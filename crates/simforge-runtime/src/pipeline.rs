//! Stage pipeline controller.
//!
//! Runs the fixed stage sequence plan, create, fix, optional feedback,
//! review, with the learning-materials stage concurrent to the markup
//! chain. The controller is infallible by construction: every stage has
//! a bounded retry and a deterministic fallback, so [`Pipeline::run`]
//! always completes with a usable [`RunResult`]. A failing review is a
//! verdict, not an error.
//!
//! All artifact interpretation lives in `simforge-core`; this module
//! only sequences generation calls and records what happened.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use simforge_core::review::{ReturnTo, Scores};
use simforge_core::{
    extract, fallback, Blueprint, Document, ExpectedShape, Extraction, FixResult, InteractionSet,
    Review, SpecRecord, Violation,
};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::prompts;
use crate::providers::{ProviderError, TextProvider};
use crate::retry::{attempt, Attempted};

/// Generation attempts per stage before falling back.
const ATTEMPTS_PER_STAGE: u32 = 2;

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Plan,
    Create,
    Fix,
    Interact,
    Feedback,
    Review,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Plan => "plan",
            Stage::Create => "create",
            Stage::Fix => "fix",
            Stage::Interact => "interact",
            Stage::Feedback => "feedback",
            Stage::Review => "review",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the artifact a stage handed downstream.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageArtifact {
    Blueprint(Blueprint),
    Document(Document),
    Interactions(InteractionSet),
    Review(Review),
}

/// One entry in the append-only audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct StageOutcome {
    pub stage: Stage,

    /// Generation attempts made, 0 when the stage was resolved without
    /// a provider call.
    pub attempts: u32,

    /// Whether the deterministic fallback supplied the artifact.
    pub fallback_used: bool,

    /// Raw provider text from the attempt that produced the artifact,
    /// kept for intermediate-file output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,

    /// The artifact handed to the next stage, as it left this one.
    pub artifact: StageArtifact,

    /// Why a fallback or degraded path was taken, and for markup stages
    /// any violations remaining after normalization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    pub finished_at: DateTime<Utc>,
}

impl StageOutcome {
    fn recorded(
        stage: Stage,
        attempts: u32,
        fallback_used: bool,
        raw_response: Option<String>,
        artifact: StageArtifact,
        note: Option<String>,
    ) -> Self {
        Self {
            stage,
            attempts,
            fallback_used,
            raw_response,
            artifact,
            note,
            finished_at: Utc::now(),
        }
    }
}

/// Everything a completed run produced.
#[derive(Debug)]
pub struct RunResult {
    pub blueprint: Blueprint,

    /// The final, normalized document.
    pub document: Document,

    /// Explanations accumulated from the fix and feedback stages.
    pub fix_notes: Vec<String>,

    /// Learning materials, absent when the stage was disabled.
    pub interactions: Option<InteractionSet>,

    pub review: Review,

    /// Violations of the final document, derived at completion and
    /// surfaced separately from the review verdict.
    pub violations: BTreeSet<Violation>,

    /// Derived verdict mirroring the review record: min score >= 3 and
    /// mean >= 4.0.
    pub passed: bool,

    /// Audit trail, one entry per stage executed, in completion order.
    pub outcomes: Vec<StageOutcome>,
}

/// What a generation attempt produced: the raw provider text and the
/// extraction recovered from it.
struct StageResponse {
    raw: String,
    extraction: Extraction,
}

#[derive(Debug)]
enum StageError {
    Provider(ProviderError),
    /// Extraction exhausted; carries the raw text so markup stages can
    /// still degrade to a best-effort document.
    Extraction { reason: String, raw: String },
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageError::Provider(err) => write!(f, "provider error: {err}"),
            StageError::Extraction { reason, .. } => write!(f, "extraction failed: {reason}"),
        }
    }
}

/// The markup chain's accumulated state: document, notes, verdict and
/// the outcomes of the stages it ran.
struct MarkupChain {
    document: Document,
    fix_notes: Vec<String>,
    review: Review,
    outcomes: Vec<StageOutcome>,
}

/// The stage pipeline controller.
pub struct Pipeline {
    provider: Arc<dyn TextProvider>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(provider: Arc<dyn TextProvider>, config: PipelineConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one full pass over the specification.
    ///
    /// Never fails: exhausted stages fall back deterministically and
    /// the degradation is recorded in the audit trail.
    pub async fn run(&self, spec: &SpecRecord) -> RunResult {
        info!(concept = %spec.concept, provider = self.provider.name(), "starting pipeline run");

        let mut outcomes = Vec::new();
        let (blueprint, plan_outcome) = self.plan_stage(spec).await;
        outcomes.push(plan_outcome);

        // The learning-materials stage depends only on the blueprint,
        // so it runs concurrently with the markup chain.
        let (chain, interactions) = if self.config.interactions_enabled {
            let (chain, interact) = tokio::join!(
                self.markup_chain(spec, &blueprint),
                self.interact_stage(spec, &blueprint),
            );
            (chain, Some(interact))
        } else {
            (self.markup_chain(spec, &blueprint).await, None)
        };

        outcomes.extend(chain.outcomes);
        let interactions = interactions.map(|(set, outcome)| {
            outcomes.push(outcome);
            set
        });

        let violations = chain.document.violations();
        let passed = chain.review.pass();
        info!(
            passed,
            score_min = chain.review.scores.min(),
            score_mean = chain.review.scores.mean(),
            violations = violations.len(),
            "pipeline run complete"
        );

        RunResult {
            blueprint,
            document: chain.document,
            fix_notes: chain.fix_notes,
            interactions,
            review: chain.review,
            violations,
            passed,
            outcomes,
        }
    }

    /// Run with bounded revision passes.
    ///
    /// After a failing review that advises returning to an earlier
    /// stage, the required changes are fed back through the feedback
    /// stage and the document re-reviewed, up to `max_passes` total
    /// passes. With the default of 1 this is identical to [`run`].
    ///
    /// [`run`]: Pipeline::run
    pub async fn run_with_revisions(&self, spec: &SpecRecord) -> RunResult {
        let mut result = self.run(spec).await;
        let mut pass = 1;

        while pass < self.config.max_passes
            && !result.passed
            && result.review.return_to != ReturnTo::None
            && !result.review.required_changes.is_empty()
        {
            pass += 1;
            info!(pass, "revision pass");
            let feedback = result.review.required_changes.join("\n");
            let (document, notes, feedback_outcome) =
                self.feedback_stage(&result.document, &feedback).await;
            let (review, review_outcome) = self.review_stage(&document).await;

            result.fix_notes.extend(notes);
            result.outcomes.push(feedback_outcome);
            result.outcomes.push(review_outcome);
            result.violations = document.violations();
            result.passed = review.pass();
            result.document = document;
            result.review = review;
        }

        result
    }

    /// The sequential document stages: create, fix, optional feedback,
    /// review.
    async fn markup_chain(&self, spec: &SpecRecord, plan: &Blueprint) -> MarkupChain {
        let mut outcomes = Vec::new();

        let (document, outcome) = self.create_stage(spec, plan).await;
        outcomes.push(outcome);

        let (mut document, mut fix_notes, outcome) = self.fix_stage(&document).await;
        outcomes.push(outcome);

        if let Some(feedback) = &self.config.feedback_text {
            let (revised, notes, outcome) = self.feedback_stage(&document, feedback).await;
            document = revised;
            fix_notes.extend(notes);
            outcomes.push(outcome);
        }

        let (review, outcome) = self.review_stage(&document).await;
        outcomes.push(outcome);

        MarkupChain {
            document,
            fix_notes,
            review,
            outcomes,
        }
    }

    async fn plan_stage(&self, spec: &SpecRecord) -> (Blueprint, StageOutcome) {
        let prompt = prompts::plan_prompt(&spec.to_json_pretty());
        let attempted = self
            .generate(Stage::Plan, &prompt, ExpectedShape::Structured, false)
            .await;
        let attempts = attempted.attempts;

        match attempted.result {
            Ok(StageResponse {
                raw,
                extraction: Extraction::Structured(payload),
            }) => {
                let blueprint = Blueprint::from_payload(&payload);
                let outcome = StageOutcome::recorded(
                    Stage::Plan,
                    attempts,
                    false,
                    Some(raw),
                    StageArtifact::Blueprint(blueprint.clone()),
                    None,
                );
                (blueprint, outcome)
            }
            other => {
                let note = match other {
                    Err(err) => err.to_string(),
                    Ok(_) => "unusable extraction shape".to_string(),
                };
                warn!(attempts, %note, "plan stage exhausted, using fallback blueprint");
                let blueprint = fallback::blueprint(spec);
                let outcome = StageOutcome::recorded(
                    Stage::Plan,
                    attempts,
                    true,
                    None,
                    StageArtifact::Blueprint(blueprint.clone()),
                    Some(note),
                );
                (blueprint, outcome)
            }
        }
    }

    async fn create_stage(&self, spec: &SpecRecord, plan: &Blueprint) -> (Document, StageOutcome) {
        let prompt = prompts::create_prompt(&plan.to_json_pretty());
        let attempted = self
            .generate(Stage::Create, &prompt, ExpectedShape::Markup, true)
            .await;
        let attempts = attempted.attempts;

        match attempted.result {
            Ok(StageResponse {
                raw,
                extraction: Extraction::Markup(document),
            }) => {
                let document = document.normalize();
                let note = checked_note(Stage::Create, &document, None);
                let outcome = StageOutcome::recorded(
                    Stage::Create,
                    attempts,
                    false,
                    Some(raw),
                    StageArtifact::Document(document.clone()),
                    note,
                );
                (document, outcome)
            }
            // The provider did answer but nothing document-shaped was
            // recoverable: normalize the raw text as a best-effort
            // document and let the violation set say how bad it is.
            Err(StageError::Extraction { reason, raw }) => {
                warn!(attempts, %reason, "create stage exhausted, normalizing raw text");
                let document = Document::new(raw.as_str()).normalize();
                let note = checked_note(Stage::Create, &document, Some(reason));
                let outcome = StageOutcome::recorded(
                    Stage::Create,
                    attempts,
                    true,
                    Some(raw),
                    StageArtifact::Document(document.clone()),
                    note,
                );
                (document, outcome)
            }
            other => {
                let note = match other {
                    Err(err) => err.to_string(),
                    Ok(_) => "unusable extraction shape".to_string(),
                };
                warn!(attempts, %note, "create stage exhausted, using placeholder document");
                let document = fallback::placeholder_document(&spec.concept, plan).normalize();
                let note = checked_note(Stage::Create, &document, Some(note));
                let outcome = StageOutcome::recorded(
                    Stage::Create,
                    attempts,
                    true,
                    None,
                    StageArtifact::Document(document.clone()),
                    note,
                );
                (document, outcome)
            }
        }
    }

    async fn fix_stage(&self, document: &Document) -> (Document, Vec<String>, StageOutcome) {
        let prompt = prompts::fix_prompt(document.html());
        let attempted = self
            .generate(Stage::Fix, &prompt, ExpectedShape::Structured, true)
            .await;
        self.repair_result(Stage::Fix, document, attempted)
    }

    async fn feedback_stage(
        &self,
        document: &Document,
        feedback: &str,
    ) -> (Document, Vec<String>, StageOutcome) {
        let prompt = prompts::feedback_prompt(document.html(), feedback);
        let attempted = self
            .generate(Stage::Feedback, &prompt, ExpectedShape::Structured, true)
            .await;
        self.repair_result(Stage::Feedback, document, attempted)
    }

    /// Shared interpretation for the two repair-shaped stages. On any
    /// exhaustion the incoming document survives, normalized; the run
    /// degrades, it never loses the document it already had.
    fn repair_result(
        &self,
        stage: Stage,
        document: &Document,
        attempted: Attempted<StageResponse, StageError>,
    ) -> (Document, Vec<String>, StageOutcome) {
        let attempts = attempted.attempts;

        match attempted.result {
            Ok(StageResponse {
                raw,
                extraction: Extraction::Structured(payload),
            }) => {
                let fix = FixResult::from_payload(&payload);
                let (revised, base_note) = match fix.index_html {
                    Some(html) if !html.trim().is_empty() => {
                        (Document::new(html).normalize(), None)
                    }
                    _ => (
                        document.normalize(),
                        Some("payload carried no document, input kept".to_string()),
                    ),
                };
                let note = checked_note(stage, &revised, base_note);
                let outcome = StageOutcome::recorded(
                    stage,
                    attempts,
                    false,
                    Some(raw),
                    StageArtifact::Document(revised.clone()),
                    note,
                );
                (revised, fix.explanations, outcome)
            }
            // A bare document with no JSON wrapper is still a usable
            // repair output.
            Ok(StageResponse {
                raw,
                extraction: Extraction::Markup(revised),
            }) => {
                let revised = revised.normalize();
                let note = checked_note(stage, &revised, None);
                let outcome = StageOutcome::recorded(
                    stage,
                    attempts,
                    false,
                    Some(raw),
                    StageArtifact::Document(revised.clone()),
                    note,
                );
                (revised, Vec::new(), outcome)
            }
            other => {
                let note = match other {
                    Err(err) => err.to_string(),
                    Ok(_) => "unusable extraction shape".to_string(),
                };
                warn!(%stage, attempts, %note, "repair stage exhausted, keeping input document");
                let revised = document.normalize();
                let note = checked_note(stage, &revised, Some(note));
                let outcome = StageOutcome::recorded(
                    stage,
                    attempts,
                    true,
                    None,
                    StageArtifact::Document(revised.clone()),
                    note,
                );
                (revised, Vec::new(), outcome)
            }
        }
    }

    async fn interact_stage(
        &self,
        spec: &SpecRecord,
        plan: &Blueprint,
    ) -> (InteractionSet, StageOutcome) {
        let prompt = prompts::interact_prompt(&spec.to_json_pretty(), &plan.to_json_pretty());
        let attempted = self
            .generate(Stage::Interact, &prompt, ExpectedShape::Structured, false)
            .await;
        let attempts = attempted.attempts;

        match attempted.result {
            Ok(StageResponse {
                raw,
                extraction: Extraction::Structured(payload),
            }) => {
                let interactions = InteractionSet::from_payload(&payload);
                let outcome = StageOutcome::recorded(
                    Stage::Interact,
                    attempts,
                    false,
                    Some(raw),
                    StageArtifact::Interactions(interactions.clone()),
                    None,
                );
                (interactions, outcome)
            }
            other => {
                let note = match other {
                    Err(err) => err.to_string(),
                    Ok(_) => "unusable extraction shape".to_string(),
                };
                warn!(attempts, %note, "interact stage exhausted, using fallback questions");
                let interactions = fallback::interactions(spec);
                let outcome = StageOutcome::recorded(
                    Stage::Interact,
                    attempts,
                    true,
                    None,
                    StageArtifact::Interactions(interactions.clone()),
                    Some(note),
                );
                (interactions, outcome)
            }
        }
    }

    async fn review_stage(&self, document: &Document) -> (Review, StageOutcome) {
        let prompt = prompts::review_prompt(document.html());
        let attempted = self
            .generate(Stage::Review, &prompt, ExpectedShape::Structured, false)
            .await;
        let attempts = attempted.attempts;

        match attempted.result {
            Ok(StageResponse {
                raw,
                extraction: Extraction::Structured(payload),
            }) => {
                let review = Review::from_payload(&payload);
                let outcome = StageOutcome::recorded(
                    Stage::Review,
                    attempts,
                    false,
                    Some(raw),
                    StageArtifact::Review(review.clone()),
                    None,
                );
                (review, outcome)
            }
            other => {
                let note = match other {
                    Err(err) => err.to_string(),
                    Ok(_) => "unusable extraction shape".to_string(),
                };
                warn!(attempts, %note, "review stage exhausted, recording failing verdict");
                let review = fallback_review(&note);
                let outcome = StageOutcome::recorded(
                    Stage::Review,
                    attempts,
                    true,
                    None,
                    StageArtifact::Review(review.clone()),
                    Some(note),
                );
                (review, outcome)
            }
        }
    }

    /// One bounded retry loop: generate, then extract the expected
    /// shape. Provider failures and extraction failures retry alike,
    /// with the same prompt and no backoff.
    async fn generate(
        &self,
        stage: Stage,
        prompt: &str,
        expected: ExpectedShape,
        allow_markup: bool,
    ) -> Attempted<StageResponse, StageError> {
        let params = self.config.settings(stage).params(self.config.call_timeout);

        attempt(ATTEMPTS_PER_STAGE, |n| {
            let params = params.clone();
            async move {
                debug!(%stage, attempt = n, model = %params.model, "generation call");
                let raw = self
                    .provider
                    .generate(prompt, &params)
                    .await
                    .map_err(StageError::Provider)?;

                match extract(&raw, expected) {
                    Extraction::Failed(reason) => {
                        debug!(%stage, attempt = n, %reason, "extraction failed");
                        Err(StageError::Extraction { reason, raw })
                    }
                    Extraction::Markup(_) if !allow_markup => Err(StageError::Extraction {
                        reason: "markup returned where a structured payload was expected"
                            .to_string(),
                        raw,
                    }),
                    extraction => Ok(StageResponse { raw, extraction }),
                }
            }
        })
        .await
    }
}

/// Validate a document as it leaves a markup stage and fold the result
/// into the outcome note. Violations surviving normalization are
/// counted and listed so the audit trail shows which stage handed a
/// structurally incomplete document downstream.
fn checked_note(stage: Stage, document: &Document, base: Option<String>) -> Option<String> {
    let violations = document.violations();
    if violations.is_empty() {
        return base;
    }

    let listed = violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let summary = format!(
        "{} structural violations remain after normalization: {listed}",
        violations.len()
    );
    warn!(%stage, count = violations.len(), %listed, "document left stage with violations");

    Some(match base {
        Some(base) => format!("{base}; {summary}"),
        None => summary,
    })
}

/// The failing verdict recorded when the review stage itself could not
/// produce one. All-zero scores make the derived `pass()` false.
fn fallback_review(note: &str) -> Review {
    Review {
        scores: Scores::default(),
        strengths: Vec::new(),
        required_changes: vec![
            format!("Review stage produced no usable verdict: {note}"),
            "Manual review required before publication".to_string(),
        ],
        optional_improvements: Vec::new(),
        return_to: ReturnTo::None,
    }
}
