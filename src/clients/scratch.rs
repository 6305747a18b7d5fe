//! Client-side scratch persistence: a plain key-value byte store the session
//! uses to keep pending edits and grouped snapshots across interruptions.
//! The engine never assumes a particular storage technology behind it.
//!
//! Key scheme: `editing/{unit_id}` and `editing/{code}` for pending edits
//! (the code key recovers an edit when the id is unavailable), `grouped/{key}`
//! for merged snapshot groups.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::errors::ServiceError;

pub const EDITING_PREFIX: &str = "editing/";
pub const GROUPED_PREFIX: &str = "grouped/";

#[async_trait]
pub trait ScratchStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ServiceError>;
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), ServiceError>;
    async fn delete(&self, key: &str) -> Result<(), ServiceError>;
    async fn delete_by_prefix(&self, prefix: &str) -> Result<(), ServiceError>;
}

/// In-process scratch store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryScratchStore {
    entries: DashMap<String, Vec<u8>>,
}

impl InMemoryScratchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ScratchStore for InMemoryScratchStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ServiceError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), ServiceError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<(), ServiceError> {
        self.entries.retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let store = InMemoryScratchStore::new();
        store.put("editing/7", b"payload".to_vec()).await.unwrap();
        assert_eq!(
            store.get("editing/7").await.unwrap(),
            Some(b"payload".to_vec())
        );
        store.delete("editing/7").await.unwrap();
        assert_eq!(store.get("editing/7").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_by_prefix_spares_other_namespaces() {
        let store = InMemoryScratchStore::new();
        store.put("editing/1", vec![1]).await.unwrap();
        store.put("editing/2", vec![2]).await.unwrap();
        store.put("grouped/A", vec![3]).await.unwrap();

        store.delete_by_prefix(EDITING_PREFIX).await.unwrap();

        assert_eq!(store.get("editing/1").await.unwrap(), None);
        assert_eq!(store.get("editing/2").await.unwrap(), None);
        assert_eq!(store.get("grouped/A").await.unwrap(), Some(vec![3]));
    }
}
