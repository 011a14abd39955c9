use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{check_count, with_retry, Embedder, RequestError};
use crate::config::{EmbeddingsConfig, DEFAULT_OLLAMA_URL};
use crate::error::{RagindexError, Result};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Maximum inputs per request accepted by the OpenAI embeddings API
const MAX_BATCH_SIZE: usize = 2048;

/// Request structure for OpenAI embeddings API
#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// Response structure from OpenAI embeddings API
#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

/// Individual embedding data in API response
#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI-compatible embeddings client
///
/// Works against `api.openai.com` or any server exposing `/v1/embeddings`
/// (set `base_url` accordingly).
pub struct OpenAIEmbedder {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    batch_size: usize,
    max_retries: usize,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder
    ///
    /// # Arguments
    ///
    /// * `api_key` - OpenAI API key
    /// * `base_url` - Server root, e.g. `https://api.openai.com`
    /// * `model` - Model name (e.g., "text-embedding-3-small")
    /// * `batch_size` - Maximum number of texts to send per API request (max 2048)
    pub fn new(
        api_key: String,
        base_url: &str,
        model: &str,
        batch_size: usize,
        max_retries: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagindexError::Embedding(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
            max_retries,
        })
    }

    pub fn from_config(config: &EmbeddingsConfig, api_key: String) -> Result<Self> {
        let base_url = if config.base_url.trim_end_matches('/') == DEFAULT_OLLAMA_URL {
            OPENAI_BASE_URL
        } else {
            config.base_url.as_str()
        };
        Self::new(
            api_key,
            base_url,
            &config.model,
            config.batch_size,
            config.max_retries,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }

    /// Single API request for one batch
    async fn request(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, RequestError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| RequestError::Retryable(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(RequestError::from_status(status, body, "OpenAI"));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RequestError::Fatal(format!("Failed to parse response: {}", e)))?;

        Ok(into_ordered(result))
    }
}

/// Embeddings ordered by their `index` field rather than arrival order
fn into_ordered(response: EmbeddingResponse) -> Vec<Vec<f32>> {
    let mut data = response.data;
    data.sort_by_key(|d| d.index);
    data.into_iter().map(|d| d.embedding).collect()
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
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

            // Rate limiting: small delay between full batches
            if batch.len() == self.batch_size {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }

        Ok(all_embeddings)
    }
}
