//! In-memory cache storage backend.
//!
//! Used by in-process hosts and throughout the test suite. Each generation
//! is a map from request identity to stored entry behind an async RwLock;
//! the lock is the only serialization the agent relies on.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::net::{Request, Response};

use super::storage::{CacheError, CacheGeneration, CacheStorage, StoredEntry};

#[derive(Default)]
pub struct MemoryCacheStorage {
    generations: RwLock<BTreeMap<String, Arc<MemoryGeneration>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheGeneration>, CacheError> {
        let mut generations = self.generations.write().await;
        let generation = generations
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(generation = name, "Creating in-memory cache generation");
                Arc::new(MemoryGeneration::new(name))
            })
            .clone();
        Ok(generation)
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.generations.read().await.keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, CacheError> {
        Ok(self.generations.write().await.remove(name).is_some())
    }
}

pub struct MemoryGeneration {
    name: String,
    entries: RwLock<BTreeMap<String, StoredEntry>>,
}

impl MemoryGeneration {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl CacheGeneration for MemoryGeneration {
    async fn put(&self, request: &Request, response: Response) -> Result<(), CacheError> {
        let entry = StoredEntry::new(request, &response);
        debug!(
            generation = %self.name,
            key = %entry.request_key,
            bytes = entry.body.len(),
            "Storing cache entry"
        );
        self.entries
            .write()
            .await
            .insert(entry.request_key.clone(), entry);
        Ok(())
    }

    async fn match_request(&self, request: &Request) -> Result<Option<Response>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&request.cache_key())
            .cloned()
            .map(StoredEntry::into_response))
    }

    async fn request_keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }

    async fn len(&self) -> Result<usize, CacheError> {
        Ok(self.entries.read().await.len())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn request(path: &str) -> Request {
        Request::get(Url::parse(&format!("https://safron.test{}", path)).unwrap())
    }

    #[tokio::test]
    async fn test_put_then_match() {
        let storage = MemoryCacheStorage::new();
        let generation = storage.open("safron-prices-v1").await.unwrap();

        let req = request("/logo.png");
        generation
            .put(&req, Response::new(200).with_body(b"png".to_vec()))
            .await
            .unwrap();

        let hit = generation.match_request(&req).await.unwrap().unwrap();
        assert_eq!(hit.body, b"png");
    }

    #[tokio::test]
    async fn test_match_miss_is_none() {
        let storage = MemoryCacheStorage::new();
        let generation = storage.open("safron-prices-v1").await.unwrap();
        assert!(generation
            .match_request(&request("/missing.png"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_open_is_idempotent_and_shared() {
        let storage = MemoryCacheStorage::new();
        let a = storage.open("safron-prices-v1").await.unwrap();
        let b = storage.open("safron-prices-v1").await.unwrap();

        a.put(&request("/"), Response::new(200)).await.unwrap();
        assert_eq!(b.len().await.unwrap(), 1);
        assert_eq!(storage.keys().await.unwrap(), vec!["safron-prices-v1"]);
    }

    #[tokio::test]
    async fn test_delete_removes_generation() {
        let storage = MemoryCacheStorage::new();
        storage.open("safron-prices-v0").await.unwrap();
        storage.open("safron-prices-v1").await.unwrap();

        assert!(storage.delete("safron-prices-v0").await.unwrap());
        assert!(!storage.delete("safron-prices-v0").await.unwrap());
        assert_eq!(storage.keys().await.unwrap(), vec!["safron-prices-v1"]);
    }

    #[tokio::test]
    async fn test_generations_are_isolated() {
        let storage = MemoryCacheStorage::new();
        let v0 = storage.open("safron-prices-v0").await.unwrap();
        let v1 = storage.open("safron-prices-v1").await.unwrap();

        v0.put(&request("/logo.png"), Response::new(200)).await.unwrap();
        assert!(v1
            .match_request(&request("/logo.png"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let storage = MemoryCacheStorage::new();
        let generation = storage.open("safron-prices-v1").await.unwrap();
        let req = request("/index.html");

        generation
            .put(&req, Response::new(200).with_body(b"old".to_vec()))
            .await
            .unwrap();
        generation
            .put(&req, Response::new(200).with_body(b"new".to_vec()))
            .await
            .unwrap();

        let hit = generation.match_request(&req).await.unwrap().unwrap();
        assert_eq!(hit.body, b"new");
        assert_eq!(generation.len().await.unwrap(), 1);
    }
}
