//! Qdrant vector store backend implementation.

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfigKind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use std::collections::HashMap;

use super::{TEXT_PAYLOAD_KEY, VectorStore, check_lengths};
use crate::error::VectorStoreError;
use crate::models::{SearchHit, VectorDriver, VectorStoreConfig};

/// Points per upsert request.
const UPSERT_BATCH_SIZE: usize = 256;

/// Qdrant vector store backend.
pub struct QdrantBackend {
    client: Qdrant,
}

impl QdrantBackend {
    /// Create a new Qdrant backend from configuration.
    pub fn new(config: &VectorStoreConfig) -> Result<Self, VectorStoreError> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self { client })
    }

    async fn exists(&self, name: &str) -> Result<bool, VectorStoreError> {
        self.client
            .collection_exists(name)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))
    }

    /// Vector size the collection was created with.
    async fn collection_dimension(&self, name: &str) -> Result<Option<u64>, VectorStoreError> {
        let info = self
            .client
            .collection_info(name)
            .await
            .map_err(|e| map_collection_error(name, e.to_string()))?;

        let size = info
            .result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|c| match c {
                VectorsConfigKind::Params(params) => Some(params.size),
                VectorsConfigKind::ParamsMap(_) => None,
            });
        Ok(size)
    }

    async fn create(&self, name: &str, vector_size: u64) -> Result<(), VectorStoreError> {
        let create_collection = CreateCollectionBuilder::new(name)
            .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine));

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        tracing::info!("created collection {name} (dim={vector_size})");
        Ok(())
    }
}

fn is_not_found(msg: &str) -> bool {
    let msg = msg.to_lowercase();
    msg.contains("not found") || msg.contains("doesn't exist")
}

fn map_collection_error(name: &str, msg: String) -> VectorStoreError {
    if is_not_found(&msg) {
        VectorStoreError::CollectionNotFound(name.to_string())
    } else {
        VectorStoreError::CollectionError(msg)
    }
}

#[async_trait]
impl VectorStore for QdrantBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.client
            .health_check()
            .await
            .map(|_| true)
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))
    }

    async fn ensure_collection(
        &self,
        name: &str,
        vector_size: u64,
    ) -> Result<(), VectorStoreError> {
        if self.exists(name).await? {
            return Ok(());
        }
        self.create(name, vector_size).await
    }

    async fn recreate_collection(
        &self,
        name: &str,
        vector_size: u64,
    ) -> Result<(), VectorStoreError> {
        if self.exists(name).await? {
            self.client
                .delete_collection(name)
                .await
                .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;
            tracing::info!("dropped collection {name}");
        }
        self.create(name, vector_size).await
    }

    async fn upsert(
        &self,
        name: &str,
        vectors: Vec<Vec<f32>>,
        chunks: Vec<String>,
    ) -> Result<(), VectorStoreError> {
        check_lengths(&vectors, &chunks)?;
        if vectors.is_empty() {
            return Ok(());
        }

        if let Some(expected) = self.collection_dimension(name).await?
            && let Some(bad) = vectors.iter().find(|v| v.len() as u64 != expected)
        {
            return Err(VectorStoreError::DimensionMismatch {
                expected,
                actual: bad.len() as u64,
            });
        }

        let points: Vec<PointStruct> = vectors
            .into_iter()
            .zip(chunks)
            .map(|(vector, text)| {
                let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
                payload.insert(TEXT_PAYLOAD_KEY.to_string(), text.into());
                PointStruct::new(uuid::Uuid::new_v4().to_string(), vector, payload)
            })
            .collect();

        for batch in points.chunks(UPSERT_BATCH_SIZE) {
            let upsert = UpsertPointsBuilder::new(name, batch.to_vec()).wait(true);
            self.client
                .upsert_points(upsert)
                .await
                .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;
        }

        Ok(())
    }

    async fn search(
        &self,
        name: &str,
        query: Vec<f32>,
        top_k: u64,
    ) -> Result<Vec<SearchHit>, VectorStoreError> {
        let search = SearchPointsBuilder::new(name, query, top_k).with_payload(true);

        let results = self.client.search_points(search).await.map_err(|e| {
            let msg = e.to_string();
            if is_not_found(&msg) {
                VectorStoreError::CollectionNotFound(name.to_string())
            } else {
                VectorStoreError::SearchError(msg)
            }
        })?;

        let hits = results
            .result
            .into_iter()
            .map(|point| {
                let text = point
                    .payload
                    .get(TEXT_PAYLOAD_KEY)
                    .and_then(|v| match &v.kind {
                        Some(Kind::StringValue(s)) => Some(s.clone()),
                        _ => None,
                    })
                    .unwrap_or_default();
                SearchHit::new(point.score, text)
            })
            .collect();

        Ok(hits)
    }

    async fn list_collections(&self) -> Result<Vec<String>, VectorStoreError> {
        let response = self
            .client
            .list_collections()
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        let mut names: Vec<String> = response
            .collections
            .into_iter()
            .map(|c| c.name)
            .collect();
        names.sort();
        Ok(names)
    }

    fn driver(&self) -> VectorDriver {
        VectorDriver::Qdrant
    }
}
