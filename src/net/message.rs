//! Request and response types passed between the agent, the network
//! transport, and the cache backends.

use std::collections::BTreeMap;

use url::Url;

/// HTTP methods the agent forwards. Anything a page can issue through the
/// interception seam is representable; the precache path only uses GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl Default for Method {
    fn default() -> Self {
        Self::Get
    }
}

/// An outgoing request captured by the fetch interceptor.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
}

impl Request {
    /// Build a plain GET request, the common case for both the precache
    /// batch and page asset loads.
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::Get,
            url,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Cache identity for this request. Method plus full URL, query string
    /// included, so `/logo.png` and `/logo.png?v=2` are distinct entries.
    pub fn cache_key(&self) -> String {
        format!("{} {}", self.method.as_str(), self.url)
    }
}

/// A response as delivered by the transport or replayed from the cache.
///
/// `Clone` is the duplication primitive: the fetch interceptor clones a
/// successful response so one copy goes back to the caller while the other
/// is stored in the background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// 2xx check, mirroring what the precache batch requires of every
    /// manifest entry.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header lookup by lowercase name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

// ============================================================================
// Tests
// ============================================================================
