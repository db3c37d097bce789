//! Agent configuration.
//!
//! The cache generation name, origin, and asset manifest are injected at
//! agent construction rather than read from a module-level constant, so
//! hosts and tests can run distinct generations side by side. There are
//! no environment variables and nothing is persisted.

use url::Url;

/// Current cache generation identifier for the Safron web app.
pub const DEFAULT_CACHE_NAME: &str = "safron-prices-v1";

/// Application-shell assets precached on install.
const DEFAULT_MANIFEST: [&str; 4] = ["/", "/index.html", "/logo.png", "/manifest.json"];

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Name of the cache generation this agent version owns.
    pub cache_name: String,
    /// Origin the manifest paths resolve against.
    pub origin: Url,
    /// Fixed ordered list of paths installed into a fresh generation.
    pub precache_manifest: Vec<String>,
}

impl AgentConfig {
    /// Configuration with the Safron defaults for the given origin.
    pub fn new(origin: Url) -> Self {
        Self {
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            origin,
            precache_manifest: DEFAULT_MANIFEST.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn with_cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = name.into();
        self
    }

    pub fn with_manifest<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.precache_manifest = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Resolve every manifest path against the origin, preserving order.
    pub fn manifest_urls(&self) -> Result<Vec<Url>, url::ParseError> {
        self.precache_manifest
            .iter()
            .map(|path| self.origin.join(path))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::new(Url::parse("https://safron.test").unwrap());
        assert_eq!(config.cache_name, "safron-prices-v1");
        assert_eq!(
            config.precache_manifest,
            vec!["/", "/index.html", "/logo.png", "/manifest.json"]
        );
    }

    #[test]
    fn test_manifest_urls_resolve_against_origin() {
        let config = AgentConfig::new(Url::parse("https://safron.test").unwrap());
        let urls = config.manifest_urls().unwrap();
        assert_eq!(urls[0].as_str(), "https://safron.test/");
        assert_eq!(urls[2].as_str(), "https://safron.test/logo.png");
    }

    #[test]
    fn test_builders_override_defaults() {
        let config = AgentConfig::new(Url::parse("https://safron.test").unwrap())
            .with_cache_name("safron-prices-v2")
            .with_manifest(["/", "/app.js"]);
        assert_eq!(config.cache_name, "safron-prices-v2");
        assert_eq!(config.precache_manifest, vec!["/", "/app.js"]);
    }
}
