//! Sentence embedding backends.
//!
//! The pipeline only sees the [`Embedder`] trait; the concrete model is picked
//! once at startup from [`EmbeddingConfig`] and shared for the process lifetime.

mod http;
mod onnx;

pub use http::HttpEmbedder;
pub use onnx::OnnxEmbedder;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EmbeddingError;
use crate::models::{EmbeddingBackend, EmbeddingConfig};

/// Maps text to fixed-dimension vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts. Output order matches input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Output dimensionality.
    fn dimension(&self) -> usize;

    /// Human-readable model identifier.
    fn model_id(&self) -> &str;

    /// Embed a single query string.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding response".to_string()))
    }
}

pub type SharedEmbedder = Arc<dyn Embedder>;

/// Build the configured embedding backend.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<SharedEmbedder, EmbeddingError> {
    match config.backend {
        EmbeddingBackend::Onnx => {
            let model_dir = config.resolve_model_dir().ok_or_else(|| {
                EmbeddingError::ModelNotFound("could not determine models directory".to_string())
            })?;
            tracing::info!(
                "loading embedding model {} from {}",
                config.model_id,
                model_dir.display()
            );
            let model = OnnxEmbedder::load(config, &model_dir)?;
            tracing::info!("embedding model loaded (dim={})", model.dimension());
            Ok(Arc::new(model))
        }
        EmbeddingBackend::Http => {
            tracing::info!("using embedding server at {}", config.url);
            Ok(Arc::new(HttpEmbedder::new(config)?))
        }
    }
}

/// L2-normalize a vector; zero vectors are returned unchanged.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
