//! Cache storage traits and the on-disk entry format.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::{Request, Response};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache generation not found: {0}")]
    GenerationNotFound(String),

    #[error("invalid generation name: {0}")]
    InvalidName(String),

    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache entry serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache backend error: {0}")]
    Backend(String),
}

/// A cached request/response pair plus the moment it was stored.
///
/// Serialized as JSON with the body base64-encoded, so disk entries stay
/// inspectable with ordinary tools. `request_key` carries the original
/// cache identity because the disk backend names files by its digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub request_key: String,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    #[serde(with = "body_encoding")]
    pub body: Vec<u8>,
    pub stored_at: DateTime<Utc>,
}

impl StoredEntry {
    pub fn new(request: &Request, response: &Response) -> Self {
        Self {
            request_key: request.cache_key(),
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
            stored_at: Utc::now(),
        }
    }

    pub fn into_response(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.stored_at).num_minutes()
    }
}

mod body_encoding {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// Named cache-generation store: open-by-name (creating if absent),
/// enumerate-names, delete-by-name.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheGeneration>, CacheError>;

    async fn keys(&self) -> Result<Vec<String>, CacheError>;

    /// Delete a generation. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, CacheError>;
}

/// One generation: a key-value store from request identity to stored response.
#[async_trait]
pub trait CacheGeneration: Send + Sync {
    async fn put(&self, request: &Request, response: Response) -> Result<(), CacheError>;

    async fn match_request(&self, request: &Request) -> Result<Option<Response>, CacheError>;

    /// All request identities currently stored.
    async fn request_keys(&self) -> Result<Vec<String>, CacheError>;

    async fn len(&self) -> Result<usize, CacheError>;
}

// ============================================================================
// Tests
// ============================================================================
