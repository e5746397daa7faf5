//! Ollama embedding provider using the `/api/embed` endpoint.
//!
//! This module is only available when the `ollama` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::EmbeddingConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const PROVIDER: &str = "Ollama";

/// An [`EmbeddingProvider`] backed by a local or remote Ollama server.
///
/// Every request carries the configured timeout; a non-success status or a
/// response with the wrong number of vectors fails the call. Nothing is retried.
///
/// # Example
///
/// ```rust,ignore
/// use finrag::{EmbeddingConfig, OllamaEmbeddingProvider};
///
/// let provider = OllamaEmbeddingProvider::new(EmbeddingConfig::default())?;
/// let embedding = provider.embed("operating margin").await?;
/// ```
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbeddingProvider {
    /// Create a provider from connection settings.
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        if config.model.is_empty() {
            return Err(RagError::ConfigError("embedding model must not be empty".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/embed", config.base_url.trim_end_matches('/')),
            model: config.model,
            dimensions: config.dimensions,
        })
    }
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest { model: &self.model, input: texts })
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                RagError::EmbeddingError {
                    provider: PROVIDER.into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        if parsed.embeddings.len() != texts.len() {
            return Err(RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    parsed.embeddings.len()
                ),
            });
        }

        Ok(parsed.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let config = EmbeddingConfig { base_url: "http://gpu-box:11434/".into(), ..Default::default() };
        let provider = OllamaEmbeddingProvider::new(config).unwrap();
        assert_eq!(provider.endpoint, "http://gpu-box:11434/api/embed");
        assert_eq!(provider.dimensions(), 768);
    }

    #[test]
    fn empty_model_is_rejected() {
        let config = EmbeddingConfig { model: String::new(), ..Default::default() };
        assert!(matches!(OllamaEmbeddingProvider::new(config), Err(RagError::ConfigError(_))));
    }

    #[tokio::test]
    async fn empty_batch_makes_no_request() {
        let config = EmbeddingConfig { base_url: "http://127.0.0.1:9".into(), ..Default::default() };
        let provider = OllamaEmbeddingProvider::new(config).unwrap();
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }
}
