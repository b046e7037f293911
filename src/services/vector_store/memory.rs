//! Process-local vector store with an exact cosine scan.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{VectorStore, check_lengths};
use crate::error::VectorStoreError;
use crate::models::{SearchHit, VectorDriver};

struct Point {
    vector: Vec<f32>,
    text: String,
}

struct Collection {
    dimension: u64,
    points: Vec<Point>,
}

impl Collection {
    fn new(dimension: u64) -> Self {
        Self {
            dimension,
            points: Vec::new(),
        }
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), VectorStoreError> {
        let actual = vector.len() as u64;
        if actual != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }
}

/// In-memory backend. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryBackend {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points stored in `name`, if the collection exists.
    pub async fn point_count(&self, name: &str) -> Option<usize> {
        self.collections
            .read()
            .await
            .get(name)
            .map(|c| c.points.len())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for MemoryBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        Ok(true)
    }

    async fn ensure_collection(
        &self,
        name: &str,
        vector_size: u64,
    ) -> Result<(), VectorStoreError> {
        self.collections
            .write()
            .await
            .entry(name.to_string())
            .or_insert_with(|| Collection::new(vector_size));
        Ok(())
    }

    async fn recreate_collection(
        &self,
        name: &str,
        vector_size: u64,
    ) -> Result<(), VectorStoreError> {
        self.collections
            .write()
            .await
            .insert(name.to_string(), Collection::new(vector_size));
        Ok(())
    }

    async fn upsert(
        &self,
        name: &str,
        vectors: Vec<Vec<f32>>,
        chunks: Vec<String>,
    ) -> Result<(), VectorStoreError> {
        check_lengths(&vectors, &chunks)?;

        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| VectorStoreError::CollectionNotFound(name.to_string()))?;

        // Validate the whole batch before storing any of it
        for vector in &vectors {
            collection.check_dimension(vector)?;
        }

        collection.points.extend(
            vectors
                .into_iter()
                .zip(chunks)
                .map(|(vector, text)| Point { vector, text }),
        );
        Ok(())
    }

    async fn search(
        &self,
        name: &str,
        query: Vec<f32>,
        top_k: u64,
    ) -> Result<Vec<SearchHit>, VectorStoreError> {
        let collections = self.collections.read().await;
        let collection = collections
            .get(name)
            .ok_or_else(|| VectorStoreError::CollectionNotFound(name.to_string()))?;
        collection.check_dimension(&query)?;

        let mut hits: Vec<SearchHit> = collection
            .points
            .iter()
            .map(|p| SearchHit::new(cosine_similarity(&query, &p.vector), p.text.clone()))
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(usize::try_from(top_k).unwrap_or(usize::MAX));
        Ok(hits)
    }

    async fn list_collections(&self) -> Result<Vec<String>, VectorStoreError> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn driver(&self) -> VectorDriver {
        VectorDriver::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_upsert_then_search_returns_exact_match_first() {
        let store = MemoryBackend::new();
        store.recreate_collection("docs", 3).await.unwrap();
        store
            .upsert(
                "docs",
                vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.7, 0.7, 0.0]],
                texts(&["alpha", "beta", "gamma"]),
            )
            .await
            .unwrap();

        let hits = store.search("docs", vec![0.0, 1.0, 0.0], 2).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "beta");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].text, "gamma");
    }

    #[tokio::test]
    async fn test_search_missing_collection() {
        let store = MemoryBackend::new();
        let err = store.search("nope", vec![1.0], 5).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::CollectionNotFound(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejects_whole_batch() {
        let store = MemoryBackend::new();
        store.ensure_collection("docs", 2).await.unwrap();
        let err = store
            .upsert("docs", vec![vec![1.0, 0.0], vec![1.0]], texts(&["a", "b"]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            VectorStoreError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
        assert_eq!(store.point_count("docs").await, Some(0));
    }

    #[tokio::test]
    async fn test_ensure_keeps_points_recreate_drops_them() {
        let store = MemoryBackend::new();
        store.ensure_collection("docs", 1).await.unwrap();
        store
            .upsert("docs", vec![vec![1.0]], texts(&["a"]))
            .await
            .unwrap();

        store.ensure_collection("docs", 1).await.unwrap();
        assert_eq!(store.point_count("docs").await, Some(1));

        store.recreate_collection("docs", 1).await.unwrap();
        assert_eq!(store.point_count("docs").await, Some(0));
    }

    #[tokio::test]
    async fn test_list_collections_sorted() {
        let store = MemoryBackend::new();
        store.ensure_collection("zeta", 1).await.unwrap();
        store.ensure_collection("alpha", 1).await.unwrap();
        assert_eq!(store.list_collections().await.unwrap(), texts(&["alpha", "zeta"]));
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
