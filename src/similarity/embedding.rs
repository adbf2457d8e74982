use async_trait::async_trait;
use log2::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

use super::{cosine_similarity, Similarity};
use crate::error::{backoff_delay, SimilarityError};
use crate::USER_AGENT;

/// Default timeout for embedding requests in seconds
pub const EMBEDDING_REQUEST_TIMEOUT_SEC: u64 = 30;

/// Similarity backed by an OpenAI-compatible embedding service.
///
/// Embeddings are memoized by text for the lifetime of the handle, so the
/// target title is embedded once per walk rather than once per candidate.
pub struct EmbeddingSimilarity {
    client: Client,
    base_url: Url,
    model: String,
    api_key: Option<String>,
    request_timeout: Duration,
    max_retries: usize,
    memo: Mutex<HashMap<String, Vec<f32>>>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

impl EmbeddingSimilarity {
    pub fn new(base_url: Url, model: String) -> Result<Self, SimilarityError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url,
            model,
            api_key: None,
            request_timeout: Duration::from_secs(EMBEDDING_REQUEST_TIMEOUT_SEC),
            max_retries: 3,
            memo: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url.as_str().trim_end_matches('/'))
    }

    fn memoized(&self, text: &str) -> Option<Vec<f32>> {
        self.memo.lock().ok()?.get(text).cloned()
    }

    fn remember(&self, text: &str, embedding: &[f32]) {
        if let Ok(mut memo) = self.memo.lock() {
            memo.insert(text.to_string(), embedding.to_vec());
        }
    }

    /// Embeddings for `texts`, in order, asking the service only for the ones
    /// not seen before.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, SimilarityError> {
        let mut known: Vec<Option<Vec<f32>>> = texts.iter().map(|t| self.memoized(t)).collect();
        let mut missing: Vec<&str> = Vec::new();
        for (text, slot) in texts.iter().zip(&known) {
            if slot.is_none() && !missing.contains(text) {
                missing.push(*text);
            }
        }

        if !missing.is_empty() {
            let fetched = self.request_with_retry(&missing).await?;
            for (text, embedding) in missing.iter().zip(&fetched) {
                self.remember(text, embedding);
            }
            for (text, slot) in texts.iter().zip(known.iter_mut()) {
                if slot.is_none() {
                    let pos = missing.iter().position(|m| m == text);
                    *slot = pos.map(|p| fetched[p].clone());
                }
            }
        }

        known
            .into_iter()
            .map(|v| v.ok_or_else(|| SimilarityError::InvalidResponse("missing embedding".to_string())))
            .collect()
    }

    async fn request_with_retry(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, SimilarityError> {
        let mut attempt = 0;
        loop {
            match self.make_request(texts).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    attempt += 1;
                    warn!(
                        "Embedding request failed (attempt {}/{}): {}",
                        attempt,
                        self.max_retries + 1,
                        e
                    );
                    sleep(backoff_delay(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn make_request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, SimilarityError> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
        };
        let mut request = self
            .client
            .post(self.endpoint())
            .timeout(self.request_timeout)
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| SimilarityError::InvalidResponse(e.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(SimilarityError::InvalidResponse(format!(
                "asked for {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }
        parsed.data.sort_by_key(|item| item.index);
        debug!("Embedded {} texts with {}", texts.len(), self.model);
        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }
}

fn is_retryable(e: &SimilarityError) -> bool {
    match e {
        SimilarityError::Timeout => true,
        SimilarityError::Request(e) => e.status().is_none_or(|s| s.is_server_error()),
        _ => false,
    }
}

#[async_trait]
impl Similarity for EmbeddingSimilarity {
    async fn similarity(&self, a: &str, b: &str) -> Result<f64, SimilarityError> {
        let embeddings = self.embed(&[a, b]).await?;
        let (va, vb) = (&embeddings[0], &embeddings[1]);
        if va.len() != vb.len() {
            return Err(SimilarityError::InvalidResponse(format!(
                "embedding dimensions differ: {} vs {}",
                va.len(),
                vb.len()
            )));
        }
        Ok(cosine_similarity(va, vb))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
