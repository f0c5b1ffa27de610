//! Text-generation provider abstractions.
//!
//! The pipeline controller never inspects how a generation call is
//! transported; it hands a prompt and per-stage parameters to a
//! [`TextProvider`] and consumes the raw text that comes back. Provider
//! failures are recoverable by design: the controller treats them the
//! same as extraction failures.
//!
//! ## Security
//!
//! All providers use the [`secrets`] module for credential handling.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub mod secrets;

#[cfg(feature = "openrouter")]
mod openrouter;

pub use secrets::ApiCredential;

#[cfg(feature = "openrouter")]
pub use openrouter::OpenRouterProvider;

/// Errors from text-generation providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Response parse error: {0}")]
    ParseError(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Parameters for one generation call, taken from the stage settings.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Model to use
    pub model: String,

    /// Sampling temperature (0.0 for deterministic)
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Request timeout
    pub timeout: Duration,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: "kwaipilot/kat-coder-pro:free".to_string(),
            temperature: 0.0,
            max_tokens: 8192,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Provider abstraction allows swapping generation backends.
///
/// This is the ONLY place where generation calls are made. Extraction,
/// validation, normalization and fallback synthesis never call this.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Execute one generation call and return the raw response text.
    async fn generate(&self, prompt: &str, params: &GenerationParams)
        -> Result<String, ProviderError>;

    /// Check if the provider is usable.
    async fn health_check(&self) -> bool;

    /// Provider name for logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = GenerationParams::default();
        assert_eq!(params.temperature, 0.0);
        assert!(params.max_tokens > 0);
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::ApiError {
            status: 503,
            message: "overloaded".to_string(),
        };
        assert!(err.to_string().contains("503"));
    }
}
