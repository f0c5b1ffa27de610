//! OpenRouter provider implementation.
//!
//! Speaks the OpenAI-compatible chat completions API at
//! `https://openrouter.ai/api/v1`, which fronts the free-tier models
//! the pipeline defaults to.

use super::{secrets::ApiCredential, GenerationParams, ProviderError, TextProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable name for the OpenRouter API key.
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// OpenRouter text-generation provider.
#[derive(Debug)]
pub struct OpenRouterProvider {
    credential: ApiCredential,
    base_url: String,
}

impl OpenRouterProvider {
    /// Create a provider with an explicit key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            credential: ApiCredential::new(api_key, "OpenRouter API key"),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from the `OPENROUTER_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, ProviderError> {
        let credential = ApiCredential::from_env(OPENROUTER_API_KEY_ENV, "OpenRouter API key")?;
        Ok(Self {
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn client(&self) -> &reqwest::Client {
        static CLIENT: std::sync::OnceLock<reqwest::Client> = std::sync::OnceLock::new();
        CLIENT.get_or_init(|| {
            reqwest::Client::builder()
                .timeout(Duration::from_secs(180))
                .build()
                .expect("Failed to build HTTP client")
        })
    }
}

/// Chat completions request format.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Chat completions response format.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl TextProvider for OpenRouterProvider {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: params.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        // The credential is only exposed here, at the point of use.
        let response = self
            .client()
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.credential.expose())
            .timeout(params.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(params.timeout)
                } else {
                    ProviderError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|e| e.to_string());
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::ParseError("response carried no content".to_string()))
    }

    async fn health_check(&self) -> bool {
        !self.credential.is_empty()
    }

    fn name(&self) -> &str {
        "openrouter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name() {
        let provider = OpenRouterProvider::new("test-key");
        assert_eq!(provider.name(), "openrouter");
    }

    #[tokio::test]
    async fn test_health_check_requires_key() {
        assert!(OpenRouterProvider::new("test-key").health_check().await);
        assert!(!OpenRouterProvider::new("").health_check().await);
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let secret = "sk-or-super-secret-key";
        let provider = OpenRouterProvider::new(secret);
        let debug = format!("{provider:?}");
        assert!(!debug.contains(secret));
    }

    #[test]
    fn test_custom_base_url() {
        let provider = OpenRouterProvider::new("k").with_base_url("http://localhost:9999/v1");
        assert_eq!(provider.base_url, "http://localhost:9999/v1");
    }
}
