//! Vector store abstraction layer.
//!
//! Every dataset owns one collection named after it. Backends are selected from
//! [`VectorStoreConfig`] and shared behind [`SharedVectorStore`].

mod memory;
mod qdrant;

pub use memory::MemoryBackend;
pub use qdrant::QdrantBackend;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::VectorStoreError;
use crate::models::{SearchHit, VectorDriver, VectorStoreConfig};

/// Payload key holding the chunk text of a point.
pub const TEXT_PAYLOAD_KEY: &str = "text";

/// Abstract trait for vector store operations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check if the vector store is healthy and accessible.
    async fn health_check(&self) -> Result<bool, VectorStoreError>;

    /// Create the collection (cosine distance, `vector_size` dimensions) unless it exists.
    async fn ensure_collection(&self, name: &str, vector_size: u64)
    -> Result<(), VectorStoreError>;

    /// Drop the collection if present and create it empty.
    async fn recreate_collection(
        &self,
        name: &str,
        vector_size: u64,
    ) -> Result<(), VectorStoreError>;

    /// Store one point per `(vector, chunk)` pair with a fresh UUID and `{text}` payload.
    async fn upsert(
        &self,
        name: &str,
        vectors: Vec<Vec<f32>>,
        chunks: Vec<String>,
    ) -> Result<(), VectorStoreError>;

    /// Nearest neighbours of `query`, best first.
    async fn search(
        &self,
        name: &str,
        query: Vec<f32>,
        top_k: u64,
    ) -> Result<Vec<SearchHit>, VectorStoreError>;

    /// Names of all collections.
    async fn list_collections(&self) -> Result<Vec<String>, VectorStoreError>;

    fn driver(&self) -> VectorDriver;
}

pub type SharedVectorStore = Arc<dyn VectorStore>;

/// Create a vector store backend based on configuration.
pub fn create_vector_store(
    config: &VectorStoreConfig,
) -> Result<SharedVectorStore, VectorStoreError> {
    match config.driver {
        VectorDriver::Qdrant => {
            tracing::info!("using qdrant vector store at {}", config.url);
            Ok(Arc::new(QdrantBackend::new(config)?))
        }
        VectorDriver::Memory => {
            tracing::info!("using in-memory vector store");
            Ok(Arc::new(MemoryBackend::new()))
        }
    }
}

fn check_lengths(vectors: &[Vec<f32>], chunks: &[String]) -> Result<(), VectorStoreError> {
    if vectors.len() != chunks.len() {
        return Err(VectorStoreError::UpsertError(format!(
            "{} vectors for {} chunks",
            vectors.len(),
            chunks.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_memory_store() {
        let config = VectorStoreConfig {
            driver: VectorDriver::Memory,
            ..Default::default()
        };
        let store = create_vector_store(&config).unwrap();
        assert_eq!(store.driver(), VectorDriver::Memory);
    }

    #[test]
    fn test_check_lengths() {
        assert!(check_lengths(&[vec![1.0]], &["a".to_string()]).is_ok());
        let err = check_lengths(&[], &["a".to_string()]).unwrap_err();
        assert!(matches!(err, VectorStoreError::UpsertError(_)));
    }
}
