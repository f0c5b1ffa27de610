//! # simforge-runtime
//!
//! Async layer of the simulation generator: text-generation providers,
//! per-stage prompts and the stage pipeline controller.
//!
//! The split with `simforge-core` is strict. Everything here that
//! touches the network or the clock stays here; everything that
//! interprets model output lives in core and is deterministic. The
//! controller sequences generation calls, hands raw text to core for
//! extraction, and falls back to core's deterministic synthesizers when
//! a stage exhausts its attempts, so a run always completes.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use simforge_core::SpecRecord;
//! use simforge_runtime::{OpenRouterProvider, Pipeline, PipelineConfig};
//!
//! let provider = Arc::new(OpenRouterProvider::from_env()?);
//! let pipeline = Pipeline::new(provider, PipelineConfig::default());
//! let spec = SpecRecord::from_json_file("spec.json")?;
//! let result = pipeline.run(&spec).await;
//! println!("passed: {}", result.passed);
//! ```

pub mod config;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod retry;

pub use config::{PipelineConfig, StageSettings};
pub use pipeline::{Pipeline, RunResult, Stage, StageArtifact, StageOutcome};
pub use providers::{GenerationParams, ProviderError, TextProvider};

#[cfg(feature = "openrouter")]
pub use providers::OpenRouterProvider;
