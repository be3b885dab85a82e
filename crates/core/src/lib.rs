pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod stores;
pub mod traits;

pub use chunking::{split_documents, split_text, SEPARATORS};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, RemoteEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{IngestError, PipelineError, StoreError};
pub use extractor::{
    extract_documents, OcrEndpointConfig, OCR_LANGUAGE, OCR_MIN_CHARS, OCR_SCALE,
};
pub use identity::{chunk_id, point_uuid};
pub use ingest::{discover_documents, load_documents, load_documents_or_fail, LoadReport};
pub use models::{
    AddReport, Chunk, ChunkMetadata, ChunkingOptions, EntryKind, IngestReport, PageDocument,
    PipelinePhase, QueryHit, ScoredHit, SkippedFile, StoreInfo, VectorRecord,
};
pub use pipeline::{KnowledgePipeline, PipelineConfig, MAX_TOP_K, MIN_TOP_K};
pub use stores::QdrantStore;
pub use traits::VectorStore;
