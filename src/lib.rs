//! Offline cache agent for the Safron live-prices web app.
//!
//! The agent owns one named cache generation and three lifecycle handlers
//! driven by a host platform: install seeds the generation with the app
//! shell, activate deletes superseded generations and claims open pages,
//! and fetch interception serves live price data network-only while static
//! assets get network-first with cache fallback and background refresh.
//!
//! The host-interaction layer is out of scope; each handler returns a
//! future the host treats as the event-completion token. Network, cache
//! storage, and page control are trait seams with shipped backends
//! (`ReqwestNetwork`, `MemoryCacheStorage`, `DiskCacheStorage`,
//! `PageRegistry`).

pub mod agent;
pub mod cache;
pub mod config;
pub mod events;
pub mod net;
pub mod pages;
pub mod policy;

pub use agent::{OfflineCacheAgent, StoreReport};
pub use cache::{
    CacheError, CacheGeneration, CacheStorage, DiskCacheStorage, MemoryCacheStorage, StoredEntry,
};
pub use config::{AgentConfig, DEFAULT_CACHE_NAME};
pub use events::{AgentState, EventOutcome, LifecycleEvent};
pub use net::{FetchError, Method, Network, Request, ReqwestNetwork, Response};
pub use pages::{PageControl, PageRegistry};
pub use policy::{classify, RequestClass};
