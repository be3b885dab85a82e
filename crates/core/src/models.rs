use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::path::PathBuf;

use crate::identity::chunk_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Extracted,
    ManualEntry,
}

/// Provenance attached to every document and chunk. Optional fields stay
/// absent in serialized payloads rather than carrying nulls.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub file_name: Option<String>,
    pub page: Option<u32>,
    pub chunk_index: Option<u64>,
    pub text_length: Option<usize>,
    pub entry: Option<EntryKind>,
    pub added_by: Option<String>,
}

impl ChunkMetadata {
    /// Interchange rule: every field a consumer sees is a string, with
    /// "unknown" standing in for absent provenance.
    pub fn source_label(&self) -> String {
        if self.source.is_empty() {
            "unknown".to_string()
        } else {
            self.source.clone()
        }
    }

    pub fn page_label(&self) -> String {
        self.page
            .map(|page| page.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// One page (or one whole plain-text file) as produced by extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDocument {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A bounded, possibly overlapping slice of a parent document's text, the
/// unit of embedding and storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Deterministic identity over (source, page, chunk_index). Absent page
    /// and index default to zero so manual entries stay addressable.
    pub fn id(&self) -> String {
        chunk_id(
            &self.metadata.source,
            self.metadata.page.unwrap_or(0),
            self.metadata.chunk_index.unwrap_or(0),
        )
    }
}

/// What gets persisted: deterministic id, embedding, raw text, provenance.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A store hit, nearest-first, with the backend's distance score.
#[derive(Debug, Clone)]
pub struct ScoredHit {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub score: f64,
}

/// Query result at the interchange boundary: every field is a string, rank
/// counts from "1", score is formatted to 4 decimals when requested.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHit {
    pub rank: String,
    pub content: String,
    pub source: String,
    pub page: String,
    pub score: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkingOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 160,
        }
    }
}

impl ChunkingOptions {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// The coarser preset used for larger-context embedding models.
    pub fn coarse() -> Self {
        Self::new(1_000, 200)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Uninitialized,
    Loaded,
    Chunked,
    Indexed,
}

#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a build run: what was loaded, what was written, what was left
/// behind and why.
#[derive(Debug)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub skipped: Vec<SkippedFile>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AddReport {
    pub chunks_added: usize,
    pub source: String,
}

/// Store status as reported by `get_info`: string-typed for interchange.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreInfo {
    pub status: String,
    pub collection: String,
    pub total_chunks: Option<String>,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_provenance_serializes_as_unknown_labels() {
        let metadata = ChunkMetadata {
            source: "notes".to_string(),
            ..Default::default()
        };

        assert_eq!(metadata.source_label(), "notes");
        assert_eq!(metadata.page_label(), "unknown");
    }

    #[test]
    fn optional_fields_are_omitted_from_payloads() {
        let metadata = ChunkMetadata {
            source: "a.pdf".to_string(),
            page: Some(3),
            ..Default::default()
        };

        let value = serde_json::to_value(&metadata).expect("metadata serializes");
        assert_eq!(value["page"], 3);
        assert!(value.get("added_by").is_none());
    }

    #[test]
    fn chunk_id_defaults_page_and_index_to_zero() {
        let chunk = Chunk {
            text: "hello".to_string(),
            metadata: ChunkMetadata {
                source: "manual".to_string(),
                ..Default::default()
            },
        };

        assert_eq!(chunk.id(), chunk_id("manual", 0, 0));
    }
}
