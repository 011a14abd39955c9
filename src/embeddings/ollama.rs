use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{check_count, with_retry, Embedder, RequestError};
use crate::config::EmbeddingsConfig;
use crate::error::{RagindexError, Result};

/// Request body for Ollama's `/api/embed`
#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// Response body from Ollama's `/api/embed`
#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Client for a local Ollama instance
///
/// Calls `POST {base_url}/api/embed`, splitting large inputs into batches and
/// retrying connection errors, 429 and 5xx with exponential backoff.
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    batch_size: usize,
    max_retries: usize,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, batch_size: usize, max_retries: usize, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagindexError::Embedding(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            batch_size: batch_size.max(1),
            max_retries,
        })
    }

    pub fn from_config(config: &EmbeddingsConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            &config.model,
            config.batch_size,
            config.max_retries,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embed", self.base_url)
    }

    /// Single request for one batch
    async fn request(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, RequestError> {
        let body = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                RequestError::Retryable(format!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    self.base_url, e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(RequestError::from_status(status, body, "Ollama"));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| RequestError::Fatal(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(parsed.embeddings)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embeddings = with_retry(self.max_retries, || self.request(batch)).await?;
            check_count(batch.len(), &embeddings)?;
            all_embeddings.extend(embeddings);
        }

        log::debug!("Embedded {} text(s) with {}", texts.len(), self.model);
        Ok(all_embeddings)
    }
}
