//! `simforge` binary: run the generation pipeline over a specification
//! file and persist every artifact to a timestamped run directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use simforge_core::SpecRecord;
use simforge_runtime::{
    OpenRouterProvider, Pipeline, PipelineConfig, RunResult, Stage, StageArtifact,
};
use tracing::info;

/// Generate an interactive educational simulation from a specification.
#[derive(Parser)]
#[command(name = "simforge", version, about = "Educational simulation generation pipeline")]
struct Cli {
    /// Path to the specification JSON file
    #[arg(long, default_value = "spec.json")]
    spec: PathBuf,

    /// Root directory for run outputs
    #[arg(long, default_value = "output")]
    output_root: PathBuf,

    /// Do not write per-stage intermediate files
    #[arg(long)]
    no_save_intermediates: bool,

    /// Feedback text to incorporate after the fix stage
    #[arg(long)]
    feedback: Option<String>,

    /// Skip the learning-materials stage
    #[arg(long)]
    skip_interactions: bool,

    /// Model identifier to use for every stage
    #[arg(long)]
    model: Option<String>,

    /// Maximum passes when a failing review advises revision
    #[arg(long, default_value_t = 1)]
    max_passes: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let spec = SpecRecord::from_json_file(&cli.spec)
        .with_context(|| format!("failed to load specification {}", cli.spec.display()))?;

    let provider =
        OpenRouterProvider::from_env().context("text-generation provider not configured")?;

    let mut config = PipelineConfig::default();
    if let Some(model) = &cli.model {
        config = config.with_model(model);
    }
    config.interactions_enabled = !cli.skip_interactions;
    config.feedback_text = cli.feedback.clone();
    config.max_passes = cli.max_passes;

    let run_dir = make_run_dir(&cli.output_root, &spec.concept)?;
    info!(dir = %run_dir.display(), concept = %spec.concept, "run directory created");

    let pipeline = Pipeline::new(Arc::new(provider), config);
    let result = pipeline.run_with_revisions(&spec).await;

    write_artifacts(&run_dir, &spec, &result, !cli.no_save_intermediates)?;
    print_summary(&run_dir, &result);

    Ok(())
}

/// Create `<root>/<YYYY-MM-DD_HH-MM-SS>_<concept-slug>/`.
fn make_run_dir(root: &Path, concept: &str) -> anyhow::Result<PathBuf> {
    let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let dir = root.join(format!("{stamp}_{}", slugify(concept)));
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create run directory {}", dir.display()))?;
    Ok(dir)
}

/// Lowercase ascii-alphanumeric slug with single dashes between words.
fn slugify(concept: &str) -> String {
    let mut slug = String::with_capacity(concept.len());
    let mut pending_dash = false;
    for c in concept.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "simulation".to_string()
    } else {
        slug
    }
}

fn raw_response_file(stage: Stage) -> &'static str {
    match stage {
        Stage::Plan => "1_planner_raw_response.txt",
        Stage::Create => "2_creator_raw_response.txt",
        Stage::Fix => "3_bugfix_raw_response.txt",
        Stage::Feedback => "4_feedback_raw_response.txt",
        Stage::Interact => "4_interaction_raw_response.txt",
        Stage::Review => "6_review_raw_response.txt",
    }
}

/// Intermediate file for the document a markup stage handed downstream.
/// Structured stages have their own artifact files.
fn stage_document_file(stage: Stage) -> Option<&'static str> {
    match stage {
        Stage::Create => Some("2_creator_output.html"),
        Stage::Fix => Some("3_bugfix_output.html"),
        Stage::Feedback => Some("4_feedback_output.html"),
        _ => None,
    }
}

fn review_report(result: &RunResult) -> serde_json::Value {
    serde_json::json!({
        "scores": result.review.scores,
        "strengths": result.review.strengths,
        "required_changes": result.review.required_changes,
        "optional_improvements": result.review.optional_improvements,
        "return_to": result.review.return_to,
        "average_score": result.review.scores.mean(),
        "pass": result.passed,
    })
}

fn write_artifacts(
    dir: &Path,
    spec: &SpecRecord,
    result: &RunResult,
    save_intermediates: bool,
) -> anyhow::Result<()> {
    let write = |name: &str, contents: &str| -> anyhow::Result<()> {
        let path = dir.join(name);
        fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))
    };

    // The primary deliverable and the verdict are always written.
    write("5_final_output.html", result.document.html())?;
    write(
        "6_review_results.json",
        &serde_json::to_string_pretty(&review_report(result))?,
    )?;

    if !save_intermediates {
        return Ok(());
    }

    write("spec.json", &spec.to_json_pretty())?;
    write("1_planner_blueprint.json", &result.blueprint.to_json_pretty())?;
    if !result.fix_notes.is_empty() {
        write(
            "3_bugfix_notes.json",
            &serde_json::to_string_pretty(&result.fix_notes)?,
        )?;
    }
    if let Some(interactions) = &result.interactions {
        write(
            "4_student_interaction.json",
            &serde_json::to_string_pretty(interactions)?,
        )?;
    }
    for outcome in &result.outcomes {
        if let Some(raw) = &outcome.raw_response {
            write(raw_response_file(outcome.stage), raw)?;
        }
        if let (Some(name), StageArtifact::Document(doc)) =
            (stage_document_file(outcome.stage), &outcome.artifact)
        {
            write(name, doc.html())?;
        }
    }

    // Audit trail without the raw text, which the files above carry.
    let audit: Vec<serde_json::Value> = result
        .outcomes
        .iter()
        .map(|o| {
            serde_json::json!({
                "stage": o.stage,
                "attempts": o.attempts,
                "fallback_used": o.fallback_used,
                "note": o.note,
                "finished_at": o.finished_at,
            })
        })
        .collect();
    write("stage_outcomes.json", &serde_json::to_string_pretty(&audit)?)?;

    Ok(())
}

fn print_summary(run_dir: &Path, result: &RunResult) {
    let separator = "=".repeat(70);
    println!("{separator}");
    println!("GENERATION COMPLETE");
    println!("{separator}");
    println!(
        "Primary output: {}",
        run_dir.join("5_final_output.html").display()
    );
    println!("File size: {} bytes", result.document.html().len());
    println!();
    println!("Scores:");
    for (criterion, score) in result.review.scores.named() {
        let marker = if score >= 3 { "+" } else { "-" };
        println!("  [{marker}] {criterion}: {score}/5");
    }
    println!();
    println!("Average score: {:.2}/5.0", result.review.scores.mean());
    println!(
        "Status: {}",
        if result.passed {
            "APPROVED"
        } else {
            "NEEDS REVISION"
        }
    );

    if !result.passed && !result.review.required_changes.is_empty() {
        println!("Required changes:");
        for change in result.review.required_changes.iter().take(5) {
            println!("  - {change}");
        }
    }

    if result.violations.is_empty() {
        println!("All validation checks passed");
    } else {
        println!("{} validation issues remaining:", result.violations.len());
        for violation in &result.violations {
            println!("  - {violation}");
        }
    }
}
