use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("input text is empty")]
    EmptyInput,

    #[error("no documents found to process: {0}")]
    NoDocumentsFound(String),

    #[error("cannot create chunks from documents")]
    NoChunksProduced,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("collection does not exist: {0}")]
    IndexNotFound(String),

    #[error("backend unreachable: {0}")]
    Connectivity(#[from] reqwest::Error),

    #[error("invalid response from {backend}: {details}")]
    Backend { backend: String, details: String },

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("embedding provider returned bad data: {0}")]
    InvalidEmbedding(String),
}

/// Union of the two error families for pipeline-level operations, which cross
/// the extraction/chunking side and the embed/store side.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
