//! Text-generation collaborator.
//!
//! The orchestrator only depends on the `TextGenerator` trait; the
//! production implementation calls a local Ollama server. Tests supply
//! scripted implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use strata_core::error::StrataError;

/// Synchronous (from the caller's perspective) prompt-to-text collaborator.
///
/// Implementations may be slow or unavailable; callers are responsible for
/// bounding the wait.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce a completion for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String, StrataError>;
}

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Generator backed by Ollama's `/api/generate` endpoint.
pub struct OllamaGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaGenerator {
    /// Create a client for the given base URL and model name.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, StrataError> {
        let url = format!("{}/api/generate", self.endpoint.trim_end_matches('/'));
        let request = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| StrataError::Generation(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(StrataError::Generation(format!(
                "Backend returned {}",
                response.status()
            )));
        }

        let body: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| StrataError::Generation(format!("Invalid response body: {}", e)))?;

        Ok(body.response)
    }
}
