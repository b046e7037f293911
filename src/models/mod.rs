mod chat;
mod config;
mod search;

pub use chat::{ChatMessage, ChatRole, MAX_HISTORY_TURNS, parse_history, recent_turns};
pub use config::{
    Config, DEFAULT_BIND, DEFAULT_CHUNK_SIZE, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_GEMINI_MODELS, DEFAULT_GEMINI_URL, DEFAULT_GROQ_MODELS, DEFAULT_GROQ_URL,
    DEFAULT_QDRANT_URL, DEFAULT_TOP_K, DatasetsConfig, EmbeddingBackend, EmbeddingConfig,
    IndexingConfig, LlmConfig, LoggingConfig, ProviderConfig, ServerConfig, VectorDriver,
    VectorStoreConfig,
};
pub use search::{CONTEXT_SEPARATOR, SearchHit, join_context};
