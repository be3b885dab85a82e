use crate::chunking::split_documents;
use crate::embeddings::Embedder;
use crate::error::{IngestError, PipelineError, StoreError};
use crate::ingest::load_documents_or_fail;
use crate::models::{
    AddReport, Chunk, ChunkMetadata, ChunkingOptions, EntryKind, IngestReport, PageDocument,
    PipelinePhase, QueryHit, StoreInfo, VectorRecord,
};
use crate::traits::VectorStore;
use chrono::Utc;
use std::path::PathBuf;
use tracing::info;

/// Bounds applied to every caller-supplied `k` before it reaches the store.
pub const MIN_TOP_K: usize = 1;
pub const MAX_TOP_K: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub document_paths: Vec<PathBuf>,
    pub chunking: ChunkingOptions,
}

/// Load -> extract -> chunk -> identify -> embed -> upsert, plus the query
/// surface. Constructed once by the hosting process and passed by reference;
/// there is no global instance.
pub struct KnowledgePipeline<E, S> {
    embedder: E,
    store: S,
    config: PipelineConfig,
    phase: PipelinePhase,
}

impl<E, S> KnowledgePipeline<E, S>
where
    E: Embedder,
    S: VectorStore,
{
    pub fn new(embedder: E, store: S, config: PipelineConfig) -> Self {
        Self {
            embedder,
            store,
            config,
            phase: PipelinePhase::Uninitialized,
        }
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    /// Full ingestion run over the configured paths. Per-file problems are
    /// skipped and reported; an entirely unusable batch fails with
    /// `NoDocumentsFound` or `NoChunksProduced`.
    pub async fn build_and_upsert(&mut self) -> Result<IngestReport, PipelineError> {
        let loaded = load_documents_or_fail(&self.config.document_paths)?;
        self.phase = PipelinePhase::Loaded;

        let chunks = split_documents(&loaded.documents, &self.config.chunking);
        if chunks.is_empty() {
            return Err(IngestError::NoChunksProduced.into());
        }
        self.phase = PipelinePhase::Chunked;

        let records = self.embed_chunks(&chunks).await?;
        self.store
            .ensure_collection(self.embedder.dimensions())
            .await?;
        self.store.upsert(&records).await?;
        self.phase = PipelinePhase::Indexed;

        info!(
            documents = loaded.documents.len(),
            chunks = chunks.len(),
            skipped = loaded.skipped.len(),
            collection = self.store.name(),
            "index built"
        );

        Ok(IngestReport {
            documents: loaded.documents.len(),
            chunks: chunks.len(),
            skipped: loaded.skipped,
            finished_at: Utc::now(),
        })
    }

    /// Add free text directly, without a prior build. The text is chunked
    /// only when it exceeds the configured chunk size; otherwise it is stored
    /// whole as chunk 0. Requires the collection to already exist.
    pub async fn add_text(&self, text: &str, source_name: &str) -> Result<AddReport, PipelineError> {
        if text.trim().is_empty() {
            return Err(IngestError::EmptyInput.into());
        }

        if !self.store.collection_exists().await? {
            return Err(StoreError::IndexNotFound(self.store.name().to_string()).into());
        }

        let metadata = ChunkMetadata {
            source: source_name.to_string(),
            file_name: Some(source_name.to_string()),
            entry: Some(EntryKind::ManualEntry),
            added_by: Some("pipeline".to_string()),
            text_length: Some(text.chars().count()),
            ..Default::default()
        };

        let chunks = if text.chars().count() > self.config.chunking.chunk_size {
            let document = PageDocument {
                text: text.to_string(),
                metadata,
            };
            split_documents(&[document], &self.config.chunking)
        } else {
            let mut metadata = metadata;
            metadata.chunk_index = Some(0);
            vec![Chunk {
                text: text.to_string(),
                metadata,
            }]
        };

        let records = self.embed_chunks(&chunks).await?;
        self.store.upsert(&records).await?;

        info!(
            source = source_name,
            chunks = records.len(),
            "manual entry stored"
        );

        Ok(AddReport {
            chunks_added: records.len(),
            source: source_name.to_string(),
        })
    }

    /// K nearest chunks, rank only.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<QueryHit>, PipelineError> {
        self.run_query(text, k, false).await
    }

    /// K nearest chunks with the backend's distance score, 4 decimals.
    pub async fn query_with_scores(
        &self,
        text: &str,
        k: usize,
    ) -> Result<Vec<QueryHit>, PipelineError> {
        self.run_query(text, k, true).await
    }

    async fn run_query(
        &self,
        text: &str,
        k: usize,
        with_scores: bool,
    ) -> Result<Vec<QueryHit>, PipelineError> {
        if text.trim().is_empty() {
            return Err(IngestError::EmptyInput.into());
        }

        let k = k.clamp(MIN_TOP_K, MAX_TOP_K);

        // Querying a store that was never built is a distinct condition from
        // a query with zero hits.
        if !self.store.collection_exists().await? {
            return Err(StoreError::IndexNotFound(self.store.name().to_string()).into());
        }

        let vector = self.embedder.embed(text).await?;
        let hits = self.store.search(&vector, k).await?;

        Ok(hits
            .into_iter()
            .enumerate()
            .map(|(index, hit)| QueryHit {
                rank: (index + 1).to_string(),
                content: hit.text,
                source: hit.metadata.source_label(),
                page: hit.metadata.page_label(),
                score: with_scores.then(|| format!("{:.4}", hit.score)),
            })
            .collect())
    }

    /// Store status report. Never mutates anything.
    pub async fn get_info(&self) -> Result<StoreInfo, StoreError> {
        let collection = self.store.name().to_string();

        if !self.store.collection_exists().await? {
            return Ok(StoreInfo {
                status: "not_exists".to_string(),
                collection,
                total_chunks: None,
                message: Some("collection not found".to_string()),
            });
        }

        let count = self.store.count().await?;
        Ok(StoreInfo {
            status: "exists".to_string(),
            collection,
            total_chunks: Some(count.to_string()),
            message: None,
        })
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<VectorRecord>, StoreError> {
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        Ok(chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| VectorRecord {
                id: chunk.id(),
                vector,
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
            })
            .collect())
    }
}
