//! # simforge-core
//!
//! Deterministic extraction, validation and repair engine for generated
//! simulation artifacts.
//!
//! Text-generation models return loosely structured output; this crate
//! turns that output into well-formed artifacts or reports exactly why
//! it could not. It is the only part of the system with non-trivial
//! logic, and it holds to three guarantees:
//!
//! 1. **Deterministic**: same input always produces same output
//! 2. **No generation calls**: extraction, validation, normalization
//!    and fallback synthesis never touch the network
//! 3. **Total**: extraction returns a tagged result, never panics, and
//!    fallback synthesis succeeds for every valid specification
//!
//! ## Example
//!
//! ```rust,ignore
//! use simforge_core::{extract, ExpectedShape, Extraction};
//!
//! let raw = "Here you go:\n```json\n{\"learning_objectives\": []}\n```";
//! match extract(raw, ExpectedShape::Structured) {
//!     Extraction::Structured(payload) => println!("{} fields", payload.len()),
//!     Extraction::Markup(doc) => println!("{} bytes of markup", doc.html().len()),
//!     Extraction::Failed(reason) => println!("unrecoverable: {reason}"),
//! }
//! ```

pub mod blueprint;
pub mod document;
pub mod extract;
pub mod fallback;
pub mod review;
pub mod spec;

// Re-export main types at crate root
pub use blueprint::{
    Blueprint, FixResult, InteractionSet, MobileUiPlan, Question, SimVariable, UserInteractions,
};
pub use document::{Document, Violation, DOCTYPE, VIEWPORT_META};
pub use extract::{extract, ExpectedShape, Extraction};
pub use review::{ReturnTo, Review, Scores};
pub use spec::{SpecError, SpecRecord};
