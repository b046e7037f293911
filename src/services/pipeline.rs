//! Request-level orchestration: upload, train, retrieve, and answer.

use tracing::{debug, info};

use super::chunker::TextChunker;
use super::datasets::{DatasetStore, UploadedFile};
use super::embedding::{SharedEmbedder, create_embedder};
use super::extractor::TextExtractor;
use super::llm::{LlmGateway, Prompt, ProviderKind};
use super::vector_store::{SharedVectorStore, create_vector_store};
use crate::error::{AppError, DatasetError, PipelineError, VectorStoreError};
use crate::models::{ChatMessage, Config, DEFAULT_TOP_K, SearchHit, join_context};

pub const UPLOAD_SUCCESS: &str = "Upload successful.";
pub const TRAIN_SUCCESS: &str = "Training and embedding storage successful.";
pub const NO_RELEVANT_CONTENT: &str = "No relevant content found in dataset.";
pub const INVALID_LLM: &str = "Invalid LLM selection.";

/// Summary of a completed training run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainReport {
    pub files_read: usize,
    pub chunks: usize,
    pub dimension: usize,
}

/// Inputs of a retrieval-augmented chat turn.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub dataset: String,
    pub query: String,
    pub llm: String,
    /// Forces a single model when non-empty.
    pub model: Option<String>,
    pub top_k: Option<u64>,
    pub history: Vec<ChatMessage>,
}

/// The services a request needs, built once at startup.
pub struct RagPipeline {
    datasets: DatasetStore,
    extractor: TextExtractor,
    chunker: TextChunker,
    embedder: SharedEmbedder,
    store: SharedVectorStore,
    llm: LlmGateway,
}

impl RagPipeline {
    pub fn new(
        datasets: DatasetStore,
        extractor: TextExtractor,
        chunker: TextChunker,
        embedder: SharedEmbedder,
        store: SharedVectorStore,
        llm: LlmGateway,
    ) -> Self {
        Self {
            datasets,
            extractor,
            chunker,
            embedder,
            store,
            llm,
        }
    }

    /// Build every service from configuration. Loads the embedding model.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let embedder = create_embedder(&config.embedding)?;
        let store = create_vector_store(&config.vector_store)?;
        let llm = LlmGateway::new(&config.llm)?;
        let extractor =
            TextExtractor::new(&config.indexing).map_err(|e| AppError::Other(e.to_string()))?;

        info!(
            "pipeline ready: embedder {} (dim={}), {} vector store",
            embedder.model_id(),
            embedder.dimension(),
            store.driver()
        );
        Ok(Self::new(
            DatasetStore::new(&config.datasets),
            extractor,
            TextChunker::new(&config.indexing),
            embedder,
            store,
            llm,
        ))
    }

    /// Store uploaded files and URLs under `dataset`, creating it if needed.
    pub async fn upload(
        &self,
        dataset: &str,
        files: &[UploadedFile],
        urls: Option<&str>,
    ) -> Result<&'static str, PipelineError> {
        DatasetStore::validate_name(dataset)?;
        let urls = urls.map(str::trim).filter(|u| !u.is_empty());
        if files.is_empty() && urls.is_none() {
            return Err(PipelineError::InvalidRequest(
                "no files or urls provided".to_string(),
            ));
        }

        let saved = self.datasets.save_files(dataset, files).await?;
        let links = match urls {
            Some(urls) => self.datasets.append_urls(dataset, urls).await?,
            None => 0,
        };

        info!(
            "uploaded {} file(s) and {} url(s) to dataset {dataset}",
            saved.len(),
            links
        );
        Ok(UPLOAD_SUCCESS)
    }

    /// Rebuild the dataset's collection from its files.
    ///
    /// The previous collection is dropped, so re-training never duplicates points.
    pub async fn train(&self, dataset: &str) -> Result<TrainReport, PipelineError> {
        if !self.datasets.exists(dataset)? {
            return Err(DatasetError::NotFound(dataset.to_string()).into());
        }
        let _guard = self.datasets.lock_for_training(dataset).await;

        let files = self.datasets.list_files(dataset)?;
        let mut chunks = Vec::new();
        let mut files_read = 0;

        for path in &files {
            let text = self
                .extractor
                .extract(path)
                .await
                .map_err(|source| PipelineError::Extract {
                    file: path.display().to_string(),
                    source,
                })?;
            let Some(text) = text else {
                continue;
            };

            files_read += 1;
            let file_chunks = self.chunker.chunk(&text);
            debug!("{}: {} chunk(s)", path.display(), file_chunks.len());
            chunks.extend(file_chunks);
        }

        if chunks.is_empty() {
            return Err(PipelineError::NoContent);
        }

        info!(
            "embedding {} chunk(s) from {} file(s) in dataset {dataset}",
            chunks.len(),
            files_read
        );
        let vectors = self.embedder.embed(&chunks).await?;
        let dimension = vectors
            .first()
            .map_or_else(|| self.embedder.dimension(), Vec::len);

        self.store
            .recreate_collection(dataset, dimension as u64)
            .await?;
        let count = chunks.len();
        self.store.upsert(dataset, vectors, chunks).await?;

        info!("dataset {dataset} trained: {count} point(s), dim={dimension}");
        Ok(TrainReport {
            files_read,
            chunks: count,
            dimension,
        })
    }

    /// Nearest chunks of `dataset` to `query`.
    pub async fn query(
        &self,
        dataset: &str,
        query: &str,
        top_k: Option<u64>,
    ) -> Result<Vec<SearchHit>, PipelineError> {
        DatasetStore::validate_name(dataset)?;
        let top_k = match top_k {
            Some(0) => {
                return Err(PipelineError::InvalidRequest(
                    "top_k must be at least 1".to_string(),
                ));
            }
            Some(k) => k,
            None => DEFAULT_TOP_K,
        };

        let vector = self.embedder.embed_one(query).await?;
        let hits = self
            .store
            .search(dataset, vector, top_k)
            .await
            .map_err(|e| match e {
                VectorStoreError::CollectionNotFound(name) => {
                    PipelineError::Dataset(DatasetError::NotFound(name))
                }
                other => PipelineError::VectorStore(other),
            })?;

        debug!("query on {dataset} returned {} hit(s)", hits.len());
        Ok(hits)
    }

    /// Answer from retrieved context. LLM problems come back as the answer text.
    pub async fn chat(&self, request: &ChatRequest) -> Result<String, PipelineError> {
        let hits = self
            .query(&request.dataset, &request.query, request.top_k)
            .await?;
        let context = join_context(&hits);
        if context.is_empty() {
            return Ok(NO_RELEVANT_CONTENT.to_string());
        }

        let prompt = Prompt::answer(context, request.query.as_str(), &request.history);
        Ok(self
            .complete(&request.llm, request.model.as_deref(), &prompt)
            .await)
    }

    pub async fn summarize(&self, content: &str, llm: &str, model: Option<&str>) -> String {
        self.complete(llm, model, &Prompt::summarize(content)).await
    }

    async fn complete(&self, llm: &str, model: Option<&str>, prompt: &Prompt) -> String {
        let Ok(kind) = llm.parse::<ProviderKind>() else {
            return INVALID_LLM.to_string();
        };

        match self.llm.complete(kind, model, prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("{kind} completion failed: {e}");
                format!("LLM error: {e}")
            }
        }
    }

    /// Names of trained datasets.
    pub async fn list_datasets(&self) -> Result<Vec<String>, PipelineError> {
        Ok(self.store.list_collections().await?)
    }

    pub async fn list_models(&self, kind: ProviderKind) -> Vec<String> {
        self.llm.list_models(kind).await.unwrap_or_default()
    }

    pub async fn health(&self) -> Result<bool, PipelineError> {
        Ok(self.store.health_check().await?)
    }
}
