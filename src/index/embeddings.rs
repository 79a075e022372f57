//! Vector embeddings for semantic code search.
//!
//! This module provides:
//! - [`Embedding`]: A vector embedding for semantic similarity
//! - [`EmbeddingProvider`]: Trait for embedding generation services
//! - [`LocalEmbeddingProvider`]: Offline provider using token feature hashing
//! - [`OpenAIEmbeddingProvider`]: Client for an OpenAI-compatible `/embeddings` endpoint

use crate::config::{EmbeddingBackend, EmbeddingConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Embedding Error
// =============================================================================

/// Errors that can occur with embedding operations.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    /// The embedding vector is empty.
    EmptyVector,
    /// Dimension mismatch between embeddings.
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },
    /// The provider failed to produce embeddings.
    GenerationFailed {
        /// The provider name
        provider: String,
        /// Error message
        message: String,
    },
}

impl EmbeddingError {
    fn generation_failed(provider: &str, message: impl Into<String>) -> Self {
        Self::GenerationFailed {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for EmbeddingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyVector => write!(f, "embedding vector cannot be empty"),
            Self::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "embedding dimension mismatch: expected {}, got {}",
                    expected, actual
                )
            }
            Self::GenerationFailed { provider, message } => {
                write!(f, "embedding provider '{}' failed: {}", provider, message)
            }
        }
    }
}

impl std::error::Error for EmbeddingError {}

// =============================================================================
// Embedding
// =============================================================================

/// A vector embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    values: Vec<f32>,
}

impl Embedding {
    /// Creates a new embedding from a vector of floats.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::EmptyVector` if the vector is empty.
    pub fn new(values: Vec<f32>) -> Result<Self, EmbeddingError> {
        if values.is_empty() {
            return Err(EmbeddingError::EmptyVector);
        }
        Ok(Self { values })
    }

    /// Returns the dimension of the embedding.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Returns the embedding values as a slice.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Computes cosine similarity with another embedding.
    ///
    /// Returns a value between -1.0 and 1.0, or 0.0 when either vector has
    /// zero magnitude.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::DimensionMismatch` if the dimensions differ.
    pub fn cosine_similarity(&self, other: &Self) -> Result<f32, EmbeddingError> {
        if self.dimension() != other.dimension() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension(),
                actual: other.dimension(),
            });
        }

        let dot_product: f32 = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum();

        let magnitude_a: f32 = self.values.iter().map(|x| x * x).sum::<f32>().sqrt();
        let magnitude_b: f32 = other.values.iter().map(|x| x * x).sum::<f32>().sqrt();

        if magnitude_a == 0.0 || magnitude_b == 0.0 {
            return Ok(0.0);
        }

        Ok(dot_product / (magnitude_a * magnitude_b))
    }

    /// Returns a unit-length copy of this embedding.
    ///
    /// A zero vector is returned unchanged.
    #[must_use]
    pub fn normalize(&self) -> Self {
        let magnitude: f32 = self.values.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude == 0.0 {
            return self.clone();
        }
        Self {
            values: self.values.iter().map(|x| x / magnitude).collect(),
        }
    }
}

// =============================================================================
// Embedding Provider Trait
// =============================================================================

/// Trait for embedding generation services.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generates an embedding for the given text.
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Generates embeddings for several texts, in order.
    ///
    /// The default implementation calls [`embed`](Self::embed) once per text.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Returns the name of this provider.
    fn name(&self) -> &str;
}

/// Builds the provider selected by `config`.
///
/// The OpenAI backend falls back to the local provider when no API key is
/// available.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be constructed.
pub fn provider_from_config(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    match config.provider {
        EmbeddingBackend::Local => Ok(Arc::new(LocalEmbeddingProvider::new(config.dimensions))),
        EmbeddingBackend::Openai => {
            let api_key = config
                .api_key_env
                .as_ref()
                .and_then(|var| std::env::var(var).ok())
                .filter(|key| !key.is_empty());
            match api_key {
                Some(key) => Ok(Arc::new(OpenAIEmbeddingProvider::new(config, key)?)),
                None => {
                    tracing::warn!(
                        env = ?config.api_key_env,
                        "no embedding API key found; using local hashing embeddings"
                    );
                    Ok(Arc::new(LocalEmbeddingProvider::new(config.dimensions)))
                }
            }
        }
    }
}

// =============================================================================
// Local Embedding Provider
// =============================================================================

/// Offline embeddings built by hashing word tokens into a fixed-size vector.
///
/// Texts that share identifiers and words score higher than unrelated
/// texts, which is enough for keyword-flavoured code search without any
/// network access. Output is deterministic for a given build.
///
/// ```rust
/// use code_workbench::index::{EmbeddingProvider, LocalEmbeddingProvider};
///
/// # tokio_test::block_on(async {
/// let provider = LocalEmbeddingProvider::default();
/// let a = provider.embed("fn parse_config").await.unwrap();
/// let b = provider.embed("fn parse_config").await.unwrap();
/// assert_eq!(a, b);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct LocalEmbeddingProvider {
    dimension: usize,
}

impl LocalEmbeddingProvider {
    /// Creates a provider producing vectors of `dimension` values.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Returns the vector size.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut values = vec![0.0f32; self.dimension];
        for token in tokens(text) {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            token.hash(&mut hasher);
            let hash = hasher.finish();
            let slot = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            values[slot] += sign;
        }
        values
    }
}

impl Default for LocalEmbeddingProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

/// Lowercased alphanumeric runs, with `snake_case` and `camelCase`
/// identifiers also split into their parts.
fn tokens(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for word in text.split(|c: char| !c.is_alphanumeric() && c != '_') {
        if word.is_empty() {
            continue;
        }
        out.push(word.to_lowercase());

        let mut part = String::new();
        let mut prev_lower = false;
        for ch in word.chars() {
            let boundary = ch == '_' || (ch.is_uppercase() && prev_lower);
            if boundary && !part.is_empty() {
                out.push(std::mem::take(&mut part));
            }
            if ch != '_' {
                part.extend(ch.to_lowercase());
            }
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        }
        if !part.is_empty() && part.len() < word.len() {
            out.push(part);
        }
    }
    out
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        Ok(Embedding::new(self.vectorize(text))?.normalize())
    }

    fn name(&self) -> &str {
        "local"
    }
}

// =============================================================================
// OpenAI Embedding Provider
// =============================================================================

/// Client for an OpenAI-compatible embeddings API.
#[derive(Debug, Clone)]
pub struct OpenAIEmbeddingProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl OpenAIEmbeddingProvider {
    /// Creates a provider from configuration and a resolved API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &EmbeddingConfig, api_key: impl Into<String>) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::generation_failed("openai", e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        batch
            .pop()
            .ok_or_else(|| EmbeddingError::generation_failed(self.name(), "empty response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::generation_failed(self.name(), e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EmbeddingError::generation_failed(self.name(), e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(EmbeddingError::generation_failed(
                self.name(),
                format!("HTTP {}: {}", status.as_u16(), message),
            ));
        }

        let mut parsed: EmbeddingResponse = serde_json::from_str(&body).map_err(|e| {
            EmbeddingError::generation_failed(self.name(), format!("invalid response: {e}"))
        })?;
        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::generation_failed(
                self.name(),
                format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    parsed.data.len()
                ),
            ));
        }

        parsed.data.sort_by_key(|d| d.index);
        parsed
            .data
            .into_iter()
            .map(|d| Embedding::new(d.embedding))
            .collect()
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_new_rejects_empty() {
        assert_eq!(Embedding::new(vec![]), Err(EmbeddingError::EmptyVector));
    }

    #[test]
    fn cosine_similarity_identical_and_orthogonal() {
        let a = Embedding::new(vec![1.0, 0.0]).unwrap();
        let b = Embedding::new(vec![0.0, 1.0]).unwrap();
        assert!((a.cosine_similarity(&a).unwrap() - 1.0).abs() < 1e-6);
        assert!(a.cosine_similarity(&b).unwrap().abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_dimension_mismatch() {
        let a = Embedding::new(vec![1.0, 0.0]).unwrap();
        let b = Embedding::new(vec![1.0, 0.0, 0.0]).unwrap();
        assert!(matches!(
            a.cosine_similarity(&b),
            Err(EmbeddingError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn normalize_produces_unit_vector() {
        let e = Embedding::new(vec![3.0, 4.0]).unwrap().normalize();
        assert!((e.values()[0] - 0.6).abs() < 1e-6);
        assert!((e.values()[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn tokens_split_identifiers() {
        let t = tokens("fn parseHttpRequest(raw_bytes)");
        assert!(t.contains(&"parsehttprequest".to_string()));
        assert!(t.contains(&"parse".to_string()));
        assert!(t.contains(&"request".to_string()));
        assert!(t.contains(&"raw".to_string()));
        assert!(t.contains(&"bytes".to_string()));
    }

    #[tokio::test]
    async fn local_provider_is_deterministic() {
        let provider = LocalEmbeddingProvider::new(64);
        let a = provider.embed("read the config file").await.unwrap();
        let b = provider.embed("read the config file").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dimension(), 64);
    }

    #[tokio::test]
    async fn local_provider_ranks_shared_words_higher() {
        let provider = LocalEmbeddingProvider::default();
        let query = provider.embed("parse config").await.unwrap();
        let related = provider
            .embed("def parse_config(path): return load(path)")
            .await
            .unwrap();
        let unrelated = provider
            .embed("render the html template for the footer")
            .await
            .unwrap();

        let related_score = query.cosine_similarity(&related).unwrap();
        let unrelated_score = query.cosine_similarity(&unrelated).unwrap();
        assert!(related_score > unrelated_score);
    }

    fn openai_config(base_url: String) -> EmbeddingConfig {
        EmbeddingConfig {
            base_url,
            ..EmbeddingConfig::default()
        }
    }

    #[tokio::test]
    async fn openai_provider_orders_by_index() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"data":[
                    {"index":1,"embedding":[0.0,1.0]},
                    {"index":0,"embedding":[1.0,0.0]}
                ]}"#,
            )
            .create_async()
            .await;

        let provider = OpenAIEmbeddingProvider::new(&openai_config(server.url()), "sk-test").unwrap();
        let out = provider
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(out[0].values(), &[1.0, 0.0]);
        assert_eq!(out[1].values(), &[0.0, 1.0]);
    }

    #[tokio::test]
    async fn openai_provider_reports_api_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/embeddings")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Incorrect API key provided"}}"#)
            .create_async()
            .await;

        let provider = OpenAIEmbeddingProvider::new(&openai_config(server.url()), "bad").unwrap();
        let error = provider.embed("x").await.unwrap_err();

        let message = error.to_string();
        assert!(message.contains("401"));
        assert!(message.contains("Incorrect API key"));
    }

    #[test]
    fn local_backend_is_selected_explicitly() {
        let config = EmbeddingConfig {
            provider: EmbeddingBackend::Local,
            ..EmbeddingConfig::default()
        };
        let provider = provider_from_config(&config).unwrap();
        assert_eq!(provider.name(), "local");
    }

    #[test]
    fn missing_key_falls_back_to_local() {
        let config = EmbeddingConfig {
            api_key_env: Some("CODE_WORKBENCH_TEST_UNSET_VAR".into()),
            ..EmbeddingConfig::default()
        };
        let provider = provider_from_config(&config).unwrap();
        assert_eq!(provider.name(), "local");
    }
}
