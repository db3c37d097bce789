//! Disk-backed cache storage backend.
//!
//! One directory per generation under a root, one JSON file per entry.
//! Entry files are named by the hex SHA-256 of the request identity so
//! arbitrary URLs never leak into filesystem paths. File I/O runs on the
//! blocking pool; a slow disk must not stall the executor that is also
//! serving fetch interceptions.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::task::spawn_blocking;
use tracing::debug;

use crate::net::{Request, Response};

use super::storage::{CacheError, CacheGeneration, CacheStorage, StoredEntry};

/// Application name used for the default cache root.
const APP_NAME: &str = "safron-offline";

fn join_error(err: tokio::task::JoinError) -> CacheError {
    CacheError::Backend(format!("blocking task failed: {}", err))
}

pub struct DiskCacheStorage {
    root: PathBuf,
}

impl DiskCacheStorage {
    pub fn new(root: PathBuf) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Default root under the platform cache directory,
    /// e.g. `~/.cache/safron-offline` on Linux.
    pub fn default_root() -> Result<PathBuf, CacheError> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| CacheError::Backend("could not find cache directory".to_string()))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Generation names become directory names, so anything that could
    /// escape the root is rejected up front.
    fn validate_name(name: &str) -> Result<(), CacheError> {
        let ok = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && name != "."
            && name != "..";
        if ok {
            Ok(())
        } else {
            Err(CacheError::InvalidName(name.to_string()))
        }
    }

    fn generation_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheGeneration>, CacheError> {
        Self::validate_name(name)?;
        let dir = self.generation_dir(name);
        if !dir.exists() {
            debug!(generation = name, dir = %dir.display(), "Creating cache generation directory");
        }
        {
            let dir = dir.clone();
            spawn_blocking(move || std::fs::create_dir_all(&dir))
                .await
                .map_err(join_error)??;
        }
        Ok(Arc::new(DiskGeneration {
            name: name.to_string(),
            dir,
        }))
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let root = self.root.clone();
        let mut names = spawn_blocking(move || -> Result<Vec<String>, CacheError> {
            let mut names = Vec::new();
            for entry in std::fs::read_dir(&root)? {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    if let Some(name) = entry.file_name().to_str() {
                        names.push(name.to_string());
                    }
                }
            }
            Ok(names)
        })
        .await
        .map_err(join_error)??;
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<bool, CacheError> {
        Self::validate_name(name)?;
        let dir = self.generation_dir(name);
        spawn_blocking(move || -> Result<bool, CacheError> {
            if !dir.exists() {
                return Ok(false);
            }
            std::fs::remove_dir_all(&dir)?;
            Ok(true)
        })
        .await
        .map_err(join_error)?
    }
}

pub struct DiskGeneration {
    name: String,
    dir: PathBuf,
}

impl DiskGeneration {
    fn entry_path(&self, request: &Request) -> PathBuf {
        let digest = Sha256::digest(request.cache_key().as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }
}

#[async_trait]
impl CacheGeneration for DiskGeneration {
    async fn put(&self, request: &Request, response: Response) -> Result<(), CacheError> {
        let entry = StoredEntry::new(request, &response);
        let path = self.entry_path(request);
        debug!(
            generation = %self.name,
            key = %entry.request_key,
            file = %path.display(),
            "Storing cache entry"
        );
        let contents = serde_json::to_string_pretty(&entry)?;
        spawn_blocking(move || std::fs::write(&path, contents))
            .await
            .map_err(join_error)??;
        Ok(())
    }

    async fn match_request(&self, request: &Request) -> Result<Option<Response>, CacheError> {
        let path = self.entry_path(request);
        let entry = spawn_blocking(move || -> Result<Option<StoredEntry>, CacheError> {
            if !path.exists() {
                return Ok(None);
            }
            let contents = std::fs::read_to_string(&path)?;
            Ok(Some(serde_json::from_str(&contents)?))
        })
        .await
        .map_err(join_error)??;

        match entry {
            Some(entry) => {
                debug!(
                    generation = %self.name,
                    key = %entry.request_key,
                    age_minutes = entry.age_minutes(),
                    "Cache hit"
                );
                Ok(Some(entry.into_response()))
            }
            None => Ok(None),
        }
    }

    async fn request_keys(&self) -> Result<Vec<String>, CacheError> {
        let dir = self.dir.clone();
        let mut keys = spawn_blocking(move || -> Result<Vec<String>, CacheError> {
            let mut keys = Vec::new();
            for file in std::fs::read_dir(&dir)? {
                let file = file?;
                if file.path().extension().is_some_and(|e| e == "json") {
                    let contents = std::fs::read_to_string(file.path())?;
                    let entry: StoredEntry = serde_json::from_str(&contents)?;
                    keys.push(entry.request_key);
                }
            }
            Ok(keys)
        })
        .await
        .map_err(join_error)??;
        keys.sort();
        Ok(keys)
    }

    async fn len(&self) -> Result<usize, CacheError> {
        let dir = self.dir.clone();
        spawn_blocking(move || -> Result<usize, CacheError> {
            Ok(std::fs::read_dir(&dir)?
                .filter_map(|f| f.ok())
                .filter(|f| f.path().extension().is_some_and(|e| e == "json"))
                .count())
        })
        .await
        .map_err(join_error)?
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
    async fn test_put_survives_storage_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let req = request("/logo.png");

        {
            let storage = DiskCacheStorage::new(tmp.path().to_path_buf()).unwrap();
            let generation = storage.open("safron-prices-v1").await.unwrap();
            generation
                .put(&req, Response::new(200).with_body(b"png".to_vec()))
                .await
                .unwrap();
        }

        let storage = DiskCacheStorage::new(tmp.path().to_path_buf()).unwrap();
        let generation = storage.open("safron-prices-v1").await.unwrap();
        let hit = generation.match_request(&req).await.unwrap().unwrap();
        assert_eq!(hit.body, b"png");
    }

    #[tokio::test]
    async fn test_delete_removes_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::new(tmp.path().to_path_buf()).unwrap();

        storage.open("safron-prices-v0").await.unwrap();
        storage.open("safron-prices-v1").await.unwrap();
        assert_eq!(
            storage.keys().await.unwrap(),
            vec!["safron-prices-v0", "safron-prices-v1"]
        );

        assert!(storage.delete("safron-prices-v0").await.unwrap());
        assert!(!storage.delete("safron-prices-v0").await.unwrap());
        assert_eq!(storage.keys().await.unwrap(), vec!["safron-prices-v1"]);
    }

    #[tokio::test]
    async fn test_request_keys_recovers_identities() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::new(tmp.path().to_path_buf()).unwrap();
        let generation = storage.open("safron-prices-v1").await.unwrap();

        generation.put(&request("/"), Response::new(200)).await.unwrap();
        generation
            .put(&request("/index.html"), Response::new(200))
            .await
            .unwrap();

        assert_eq!(
            generation.request_keys().await.unwrap(),
            vec![
                "GET https://safron.test/",
                "GET https://safron.test/index.html"
            ]
        );
        assert_eq!(generation.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal_names() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::new(tmp.path().to_path_buf()).unwrap();

        assert!(matches!(
            storage.open("../escape").await,
            Err(CacheError::InvalidName(_))
        ));
        assert!(matches!(
            storage.delete("a/b").await,
            Err(CacheError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn test_match_miss_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::new(tmp.path().to_path_buf()).unwrap();
        let generation = storage.open("safron-prices-v1").await.unwrap();
        assert!(generation
            .match_request(&request("/missing.png"))
            .await
            .unwrap()
            .is_none());
    }

    // Generation handles are used from inside spawned refresh tasks, so the
    // blocking-pool offload must behave under a concurrent runtime too.
    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_puts_from_spawned_tasks() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::new(tmp.path().to_path_buf()).unwrap();
        let generation = storage.open("safron-prices-v1").await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let generation = Arc::clone(&generation);
            handles.push(tokio::spawn(async move {
                let req = request(&format!("/asset-{}.png", i));
                generation
                    .put(&req, Response::new(200).with_body(vec![i as u8]))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(generation.len().await.unwrap(), 8);
    }
}
