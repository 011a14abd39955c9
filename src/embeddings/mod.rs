pub mod ollama;
pub mod openai;

#[cfg(test)]
pub(crate) mod testing;

pub use ollama::OllamaEmbedder;
pub use openai::OpenAIEmbedder;

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::config::EmbeddingsConfig;
use crate::error::{RagindexError, Result};

/// Embedding service used both to probe the dimensionality and to embed chunks
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;

    /// Embed texts, returning one vector per input in the same order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        if embeddings.len() != 1 {
            return Err(RagindexError::Embedding(format!(
                "expected 1 embedding, got {}",
                embeddings.len()
            )));
        }
        Ok(embeddings.remove(0))
    }
}

/// Build the embedder selected by `embeddings.provider`
pub fn build_embedder(config: &EmbeddingsConfig) -> Result<Box<dyn Embedder>> {
    match config.provider.as_str() {
        "ollama" => Ok(Box::new(OllamaEmbedder::from_config(config)?)),
        "openai" => {
            let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                RagindexError::Config(format!("Environment variable {} not set", config.api_key_env))
            })?;
            Ok(Box::new(OpenAIEmbedder::from_config(config, api_key)?))
        }
        other => Err(RagindexError::Config(format!("unknown embeddings provider: {}", other))),
    }
}

/// Failure of a single HTTP request to an embedding service
#[derive(Debug)]
pub(crate) enum RequestError {
    /// Connection errors, 429 and 5xx
    Retryable(String),
    Fatal(String),
}

impl RequestError {
    pub(crate) fn from_status(status: reqwest::StatusCode, body: String, service: &str) -> Self {
        let message = format!("{} API error {}: {}", service, status, body);
        if status.as_u16() == 429 || status.is_server_error() {
            RequestError::Retryable(message)
        } else {
            RequestError::Fatal(message)
        }
    }
}

/// Run `op` with exponential backoff (1s, 2s, 4s, ...) on retryable errors
pub(crate) async fn with_retry<T, F, Fut>(max_retries: usize, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, RequestError>>,
{
    let mut attempt = 0;
    let mut delay = Duration::from_secs(1);

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(RequestError::Retryable(message)) if attempt < max_retries => {
                log::warn!("Retry {}/{} after error: {}", attempt + 1, max_retries, message);
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(RequestError::Retryable(message)) | Err(RequestError::Fatal(message)) => {
                return Err(RagindexError::Embedding(message));
            }
        }
    }
}

/// Check that a service returned one embedding per input
pub(crate) fn check_count(expected: usize, embeddings: &[Vec<f32>]) -> Result<()> {
    if embeddings.len() != expected {
        return Err(RagindexError::Embedding(format!(
            "expected {} embeddings, got {}",
            expected,
            embeddings.len()
        )));
    }
    Ok(())
}
