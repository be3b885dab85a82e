use crate::error::StoreError;
use crate::identity::point_uuid;
use crate::models::{ChunkMetadata, ScoredHit, VectorRecord};
use crate::traits::VectorStore;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use url::Url;

/// Qdrant REST adapter. One client per store instance, reused across calls;
/// connection failures surface as `Connectivity` and are never retried here.
///
/// Qdrant point ids must be UUIDs or integers, so each record's hex chunk id
/// is mapped through `point_uuid`; the full id rides in the payload.
pub struct QdrantStore {
    endpoint: Url,
    collection: String,
    client: Client,
}

impl QdrantStore {
    pub fn new(endpoint: &str, collection: impl Into<String>) -> Result<Self, StoreError> {
        Ok(Self {
            endpoint: Url::parse(endpoint)?,
            collection: collection.into(),
            client: Client::new(),
        })
    }

    fn collection_url(&self, suffix: &str) -> Result<Url, StoreError> {
        let path = format!("collections/{}{}", self.collection, suffix);
        Ok(self.endpoint.join(&path)?)
    }

    fn backend_error(details: impl ToString) -> StoreError {
        StoreError::Backend {
            backend: "qdrant".to_string(),
            details: details.to_string(),
        }
    }

    fn payload_for(record: &VectorRecord) -> Result<Value, StoreError> {
        let mut payload = serde_json::to_value(&record.metadata)?;
        payload["chunk_id"] = json!(record.id);
        payload["text"] = json!(record.text);
        Ok(payload)
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn name(&self) -> &str {
        &self.collection
    }

    async fn ensure_collection(&self, dimensions: usize) -> Result<(), StoreError> {
        if self.collection_exists().await? {
            return Ok(());
        }

        let response = self
            .client
            .put(self.collection_url("")?)
            .json(&json!({
                "vectors": { "size": dimensions, "distance": "Cosine" },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::backend_error(format!(
                "collection setup failed with {}",
                response.status()
            )));
        }

        Ok(())
    }

    async fn collection_exists(&self) -> Result<bool, StoreError> {
        let response = self
            .client
            .get(self.collection_url("")?)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(Self::backend_error(status)),
        }
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let points = records
            .iter()
            .map(|record| {
                Ok(json!({
                    "id": point_uuid(&record.id).to_string(),
                    "vector": record.vector,
                    "payload": Self::payload_for(record)?,
                }))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let response = self
            .client
            .put(self.collection_url("/points?wait=true")?)
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::backend_error(response.status()));
        }

        Ok(())
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredHit>, StoreError> {
        let response = self
            .client
            .post(self.collection_url("/points/search")?)
            .json(&json!({
                "vector": vector,
                "limit": k,
                "with_payload": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::backend_error(response.status()));
        }

        let parsed: Value = response.json().await?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut result = Vec::new();
        for hit in hits {
            let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);
            let payload = hit.pointer("/payload").cloned().unwrap_or(Value::Null);

            let text = payload
                .pointer("/text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let metadata: ChunkMetadata =
                serde_json::from_value(payload).unwrap_or_default();

            result.push(ScoredHit {
                text,
                metadata,
                score,
            });
        }

        Ok(result)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let response = self
            .client
            .get(self.collection_url("")?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::backend_error(response.status()));
        }

        let parsed: Value = response.json().await?;
        parsed
            .pointer("/result/points_count")
            .and_then(Value::as_u64)
            .ok_or_else(|| Self::backend_error("missing points_count"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::chunk_id;

    #[test]
    fn payload_keeps_full_chunk_id_and_text() {
        let record = VectorRecord {
            id: chunk_id("a.pdf", 1, 0),
            vector: vec![0.0; 4],
            text: "chunk body".to_string(),
            metadata: ChunkMetadata {
                source: "a.pdf".to_string(),
                page: Some(1),
                chunk_index: Some(0),
                ..Default::default()
            },
        };

        let payload = QdrantStore::payload_for(&record).expect("payload builds");
        assert_eq!(payload["chunk_id"], json!(record.id));
        assert_eq!(payload["text"], json!("chunk body"));
        assert_eq!(payload["source"], json!("a.pdf"));

        let roundtrip: ChunkMetadata = serde_json::from_value(payload).expect("metadata parses");
        assert_eq!(roundtrip, record.metadata);
    }

    #[test]
    fn collection_urls_join_cleanly() {
        let store = QdrantStore::new("http://localhost:6333", "chunks").expect("valid url");
        assert_eq!(
            store.collection_url("").unwrap().as_str(),
            "http://localhost:6333/collections/chunks"
        );
        assert_eq!(
            store.collection_url("/points?wait=true").unwrap().as_str(),
            "http://localhost:6333/collections/chunks/points?wait=true"
        );
    }
}
