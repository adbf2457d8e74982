//! Semantic closeness between two short texts.
//!
//! The selector only sees the [`Similarity`] trait. Concrete models are built
//! once at startup by [`load`] and handed around as `Arc<dyn Similarity>`.

pub mod embedding;
pub mod word_vectors;

use async_trait::async_trait;
use log2::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::error::SimilarityError;

pub use embedding::EmbeddingSimilarity;
pub use word_vectors::WordVectors;

/// Symmetric, bounded score; higher means more related.
#[async_trait]
pub trait Similarity: Send + Sync {
    async fn similarity(&self, a: &str, b: &str) -> Result<f64, SimilarityError>;

    /// Name shown in logs
    fn model_name(&self) -> &str;
}

/// Which model backs the similarity capability
#[derive(Debug, Clone)]
pub enum SimilarityBackend {
    /// word2vec / GloVe text file, averaged per title
    WordVectors { path: PathBuf },
    /// OpenAI-compatible `/embeddings` endpoint
    Embedding {
        base_url: Url,
        model: String,
        api_key: Option<String>,
        request_timeout: Duration,
        max_retries: usize,
    },
}

/// One-time model initialization. The returned handle is shared read-only.
pub fn load(backend: &SimilarityBackend) -> Result<Arc<dyn Similarity>, SimilarityError> {
    let model: Arc<dyn Similarity> = match backend {
        SimilarityBackend::WordVectors { path } => Arc::new(WordVectors::load(path)?),
        SimilarityBackend::Embedding {
            base_url,
            model,
            api_key,
            request_timeout,
            max_retries,
        } => Arc::new(
            EmbeddingSimilarity::new(base_url.clone(), model.clone())?
                .with_api_key(api_key.clone())
                .with_request_timeout(*request_timeout)
                .with_max_retries(*max_retries),
        ),
    };
    info!("Similarity model ready: {}", model.model_name());
    Ok(model)
}

/// Cosine of the angle between two vectors; 0 when either is all zeros.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
