//! Error types for the retrieval backend.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to text extraction from source documents.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("DOCX error: {0}")]
    Docx(String),

    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("fetch failed for {url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding server: {0}")]
    ConnectionError(String),

    #[error("embedding server error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("model load error: {0}")]
    LoadError(String),

    #[error("tokenizer error: {0}")]
    TokenizerError(String),

    #[error("inference error: {0}")]
    InferenceError(String),
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => true,
            EmbeddingError::ServerError(msg) => {
                msg.contains("503")
                    || msg.contains("502")
                    || msg.contains("504")
                    || msg.contains("429")
                    || msg.to_lowercase().contains("unavailable")
                    || msg.to_lowercase().contains("too many requests")
            }
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect(),
            EmbeddingError::InvalidResponse(_)
            | EmbeddingError::ModelNotFound(_)
            | EmbeddingError::LoadError(_)
            | EmbeddingError::TokenizerError(_)
            | EmbeddingError::InferenceError(_) => false,
        }
    }
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to connect to vector store: {0}")]
    ConnectionError(String),

    #[error("collection error: {0}")]
    CollectionError(String),

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: u64, actual: u64 },

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("search error: {0}")]
    SearchError(String),

    #[error("vector store client error: {0}")]
    ClientError(String),
}

impl Retryable for VectorStoreError {
    fn is_retryable(&self) -> bool {
        match self {
            VectorStoreError::ConnectionError(_) => true,
            VectorStoreError::CollectionError(msg)
            | VectorStoreError::UpsertError(msg)
            | VectorStoreError::SearchError(msg)
            | VectorStoreError::ClientError(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("timeout")
                    || msg_lower.contains("connection")
                    || msg_lower.contains("unavailable")
                    || msg_lower.contains("too many")
            }
            VectorStoreError::CollectionNotFound(_)
            | VectorStoreError::DimensionMismatch { .. } => false,
        }
    }
}

/// Errors raised by LLM providers and the fallback gateway.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{provider} API key not set (expected {env_var})")]
    MissingApiKey {
        provider: &'static str,
        env_var: &'static str,
    },

    #[error("rate limited on {model}: {message}")]
    RateLimited { model: String, message: String },

    #[error("API error ({status}) on {model}: {message}")]
    Api {
        model: String,
        status: u16,
        message: String,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("unknown LLM provider: {0}")]
    UnknownProvider(String),

    #[error("All {provider} models failed. Last error: {last_error}")]
    Exhausted {
        provider: &'static str,
        last_error: String,
    },
}

impl Retryable for LlmError {
    /// Only rate-limit signals move the fallback loop to the next model.
    fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::Api { status, .. } => *status == 429,
            _ => false,
        }
    }
}

/// Errors related to dataset storage on disk.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("invalid dataset name: {0:?}")]
    InvalidName(String),

    #[error("Dataset not found.")]
    NotFound(String),

    #[error("Failed to save files: {0}")]
    Write(std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the request-level pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("No valid text found in dataset.")]
    NoContent,

    #[error("failed to extract {file}: {source}")]
    Extract {
        file: String,
        #[source]
        source: ExtractError,
    },

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
