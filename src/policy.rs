//! Request classification.
//!
//! Decides which caching policy applies to an intercepted request. Live
//! price data must never be served stale, so anything under an `/api/`
//! path segment bypasses the cache entirely; everything else is a static
//! asset eligible for cache fallback and opportunistic refresh.

use url::Url;

/// Path marker that flags live-data endpoints.
const LIVE_DATA_MARKER: &str = "/api/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Network-only; responses go straight through, never cached.
    LiveData,
    /// Network-first with cache fallback and background refresh.
    StaticAsset,
}

/// Classify a URL. Pure function of the path; query string and fragment
/// never participate.
pub fn classify(url: &Url) -> RequestClass {
    if url.path().contains(LIVE_DATA_MARKER) {
        RequestClass::LiveData
    } else {
        RequestClass::StaticAsset
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_api_paths_are_live_data() {
        assert_eq!(
            classify(&url("https://safron.test/api/price/BTC")),
            RequestClass::LiveData
        );
        assert_eq!(
            classify(&url("https://safron.test/v2/api/prices")),
            RequestClass::LiveData
        );
    }

    #[test]
    fn test_asset_paths_are_static() {
        assert_eq!(
            classify(&url("https://safron.test/logo.png")),
            RequestClass::StaticAsset
        );
        assert_eq!(classify(&url("https://safron.test/")), RequestClass::StaticAsset);
        // Marker requires both slashes.
        assert_eq!(
            classify(&url("https://safron.test/apiary")),
            RequestClass::StaticAsset
        );
    }

    #[test]
    fn test_query_string_does_not_participate() {
        assert_eq!(
            classify(&url("https://safron.test/logo.png?next=/api/price")),
            RequestClass::StaticAsset
        );
        assert_eq!(
            classify(&url("https://safron.test/api/price?fmt=json")),
            RequestClass::LiveData
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        let u = url("https://safron.test/api/price/BTC");
        assert_eq!(classify(&u), classify(&u));
    }
}
