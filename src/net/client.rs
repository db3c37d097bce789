//! Network transport seam and the reqwest-backed implementation.
//!
//! The agent never talks to the network directly; it goes through the
//! `Network` trait so hosts (and tests) can substitute their own transport.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{FetchError, Method, Request, Response};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow responses while failing fast enough that the cache
/// fallback still feels responsive when the network is gone.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Fetch-by-request transport.
///
/// Returns `Ok` for any delivered response regardless of status; `Err` only
/// when no response could be produced (offline, DNS failure, timeout).
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// reqwest-backed transport.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ReqwestNetwork {
    client: Client,
}

impl ReqwestNetwork {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(FetchError::from_reqwest)?;

        Ok(Self { client })
    }

    fn to_reqwest_method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl Network for ReqwestNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), request.url.clone());

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(FetchError::from_reqwest)?;

        let status = response.status().as_u16();
        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            // Non-UTF-8 header values are rare and never load-bearing for
            // cached assets; skip them rather than fail the fetch.
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_ascii_lowercase(), value.to_string());
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(FetchError::from_reqwest)?
            .to_vec();

        debug!(url = %request.url, status, bytes = body.len(), "Fetched from network");

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
