pub mod chunker;
pub mod datasets;
pub mod embedding;
pub mod extractor;
pub mod llm;
pub mod pipeline;
pub mod vector_store;

pub use chunker::TextChunker;
pub use datasets::{DatasetStore, LINKS_FILE, TrainingGuard, UploadedFile};
pub use embedding::{Embedder, HttpEmbedder, OnnxEmbedder, SharedEmbedder, create_embedder};
pub use extractor::{DocumentKind, TextExtractor};
pub use llm::{ChatProvider, GeminiProvider, GroqProvider, LlmGateway, Prompt, ProviderKind};
pub use pipeline::{
    ChatRequest, INVALID_LLM, NO_RELEVANT_CONTENT, RagPipeline, TRAIN_SUCCESS, TrainReport,
    UPLOAD_SUCCESS,
};
pub use vector_store::{
    MemoryBackend, QdrantBackend, SharedVectorStore, VectorStore, create_vector_store,
};
