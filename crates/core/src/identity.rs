use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Deterministic chunk identity: SHA-256 over `"{source}-{page}-{index}"`,
/// lowercase hex. Identical triples always hash to the same id, which is what
/// makes re-ingestion an upsert instead of a duplicate insert.
pub fn chunk_id(source: &str, page: u32, chunk_index: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{source}-{page}-{chunk_index}").as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Backend point id derived from a chunk id. Vector backends that only accept
/// UUID or integer ids get the first 16 digest bytes re-encoded as a UUID;
/// the full hex id stays in the payload. Non-hex input folds to the nil UUID.
pub fn point_uuid(chunk_id: &str) -> Uuid {
    let prefix = chunk_id.get(..32).unwrap_or_default();
    u128::from_str_radix(prefix, 16)
        .map(|value| Uuid::from_bytes(value.to_be_bytes()))
        .unwrap_or_else(|_| Uuid::nil())
}

#[cfg(test)]
mod tests {
    use super::{chunk_id, point_uuid};
    use std::collections::HashSet;

    #[test]
    fn identical_triples_hash_identically() {
        let first = chunk_id("/docs/guide.pdf", 4, 17);
        let second = chunk_id("/docs/guide.pdf", 4, 17);
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn distinct_triples_do_not_collide() {
        let mut seen = HashSet::new();
        for page in 0..10u32 {
            for index in 0..10u64 {
                seen.insert(chunk_id("a.pdf", page, index));
                seen.insert(chunk_id("b.pdf", page, index));
            }
        }
        assert_eq!(seen.len(), 200);
    }

    #[test]
    fn point_uuid_is_stable_per_chunk_id() {
        let id = chunk_id("notes", 0, 0);
        assert_eq!(point_uuid(&id), point_uuid(&id));
        assert_ne!(point_uuid(&id), point_uuid(&chunk_id("notes", 0, 1)));
    }
}
