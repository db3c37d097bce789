//! The offline cache agent.
//!
//! Owns one named cache generation and the three lifecycle handlers:
//! install seeds the generation with the asset manifest, activate deletes
//! superseded generations and claims open pages, and fetch interception
//! applies the network-only or network-first policy per request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::future::{join_all, try_join_all};
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::{CacheError, CacheStorage};
use crate::config::AgentConfig;
use crate::events::{AgentState, EventOutcome, LifecycleEvent, StateTransitionError};
use crate::net::{FetchError, Network, Request, Response};
use crate::pages::PageControl;
use crate::policy::{classify, RequestClass};

/// Settlement notice for one background cache refresh.
///
/// The fetch interceptor stores responses fire-and-forget; callers never
/// wait on the write. Reports land on an internal channel so tests (and
/// curious hosts) can await settlement instead of sleeping.
#[derive(Debug, Clone)]
pub enum StoreReport {
    Stored { request_key: String },
    Failed { request_key: String, error: String },
}

pub struct OfflineCacheAgent {
    config: AgentConfig,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    pages: Arc<dyn PageControl>,
    state: RwLock<AgentState>,
    skip_waiting: AtomicBool,
    store_tx: mpsc::UnboundedSender<StoreReport>,
    store_rx: Mutex<mpsc::UnboundedReceiver<StoreReport>>,
}

impl OfflineCacheAgent {
    pub fn new(
        config: AgentConfig,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        pages: Arc<dyn PageControl>,
    ) -> Self {
        let (store_tx, store_rx) = mpsc::unbounded_channel();
        Self {
            config,
            storage,
            network,
            pages,
            state: RwLock::new(AgentState::New),
            skip_waiting: AtomicBool::new(false),
            store_tx,
            store_rx: Mutex::new(store_rx),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub async fn state(&self) -> AgentState {
        *self.state.read().await
    }

    /// Whether install asked the host to activate this version immediately
    /// instead of waiting for open pages to close.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    async fn transition(&self, next: AgentState) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.can_transition_to(next) {
            return Err(StateTransitionError {
                from: state.as_str(),
                to: next.as_str(),
            }
            .into());
        }
        debug!(from = state.as_str(), to = next.as_str(), "Agent state transition");
        *state = next;
        Ok(())
    }

    /// Dispatch one host event onto its handler. The returned future is the
    /// completion token; the host extends event lifetime until it resolves.
    pub async fn dispatch(&self, event: LifecycleEvent) -> Result<EventOutcome> {
        debug!(event = event.kind(), "Dispatching lifecycle event");
        match event {
            LifecycleEvent::Install => {
                self.handle_install().await?;
                Ok(EventOutcome::Completed)
            }
            LifecycleEvent::Activate => {
                self.handle_activate().await?;
                Ok(EventOutcome::Completed)
            }
            LifecycleEvent::Fetch(request) => {
                let response = self.handle_fetch(&request).await?;
                Ok(EventOutcome::Response(response))
            }
        }
    }

    // ========================================================================
    // Install
    // ========================================================================

    /// Seed the current generation with the asset manifest.
    ///
    /// The whole manifest is fetched as one batch; any entry failing to
    /// fetch or store fails the install, and the host is expected to keep
    /// the previous agent version active.
    pub async fn handle_install(&self) -> Result<()> {
        self.transition(AgentState::Installing).await?;

        match self.precache().await {
            Ok(count) => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                info!(
                    generation = %self.config.cache_name,
                    entries = count,
                    "Install complete, skip-waiting requested"
                );
                self.transition(AgentState::Installed).await
            }
            Err(err) => {
                warn!(generation = %self.config.cache_name, error = %err, "Install failed");
                // Host retries with a fresh install if it wants this version.
                let _ = self.transition(AgentState::New).await;
                Err(err)
            }
        }
    }

    async fn precache(&self) -> Result<usize> {
        let generation = self
            .storage
            .open(&self.config.cache_name)
            .await
            .context("failed to open cache generation")?;

        let urls = self
            .config
            .manifest_urls()
            .context("invalid precache manifest path")?;
        let count = urls.len();

        let fetches = urls.into_iter().map(|url| {
            let request = Request::get(url);
            let network = Arc::clone(&self.network);
            let generation = Arc::clone(&generation);
            async move {
                let response = network
                    .fetch(&request)
                    .await
                    .with_context(|| format!("failed to fetch precache entry {}", request.url))?;
                if !response.is_success() {
                    bail!(
                        "precache entry {} returned status {}",
                        request.url,
                        response.status
                    );
                }
                generation
                    .put(&request, response)
                    .await
                    .with_context(|| format!("failed to store precache entry {}", request.url))
            }
        });

        try_join_all(fetches).await?;
        Ok(count)
    }

    // ========================================================================
    // Activate
    // ========================================================================

    /// Delete every generation except the current one, then claim all open
    /// pages. Deletions are independent: one failure is logged and does not
    /// block the rest.
    pub async fn handle_activate(&self) -> Result<()> {
        self.transition(AgentState::Activating).await?;

        let names = self
            .storage
            .keys()
            .await
            .context("failed to enumerate cache generations")?;
        let stale: Vec<String> = names
            .into_iter()
            .filter(|name| *name != self.config.cache_name)
            .collect();

        let deletions = stale.iter().map(|name| {
            let storage = Arc::clone(&self.storage);
            async move { (name.clone(), storage.delete(name).await) }
        });

        for (name, result) in join_all(deletions).await {
            match result {
                Ok(true) => info!(generation = %name, "Deleted stale cache generation"),
                Ok(false) => debug!(generation = %name, "Stale generation already gone"),
                Err(err) => {
                    warn!(generation = %name, error = %err, "Failed to delete stale cache generation")
                }
            }
        }

        let claimed = self
            .pages
            .claim(&self.config.cache_name)
            .await
            .context("failed to claim open pages")?;
        info!(generation = %self.config.cache_name, pages = claimed, "Agent activated");

        self.transition(AgentState::Activated).await
    }

    // ========================================================================
    // Fetch interception
    // ========================================================================

    /// Apply the caching policy to one intercepted request.
    ///
    /// Live-data requests go straight to the network and their outcome,
    /// success or failure, is returned untouched. Static assets are
    /// network-first: any delivered response wins and refreshes the cache
    /// in the background, a transport failure falls back to the cache, and
    /// a double miss yields the offline placeholder.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Response, FetchError> {
        match classify(&request.url) {
            RequestClass::LiveData => {
                debug!(url = %request.url, "Live data, network only");
                self.network.fetch(request).await
            }
            RequestClass::StaticAsset => self.fetch_static_asset(request).await,
        }
    }

    async fn fetch_static_asset(&self, request: &Request) -> Result<Response, FetchError> {
        match self.network.fetch(request).await {
            Ok(response) => {
                // Whatever the transport delivered refreshes the cache;
                // only transport failure takes the fallback branch.
                self.spawn_refresh(request.clone(), response.clone());
                Ok(response)
            }
            Err(err) => {
                debug!(url = %request.url, error = %err, "Network failed, trying cache fallback");
                match self.lookup_cached(request).await {
                    Some(cached) => Ok(cached),
                    None => {
                        warn!(url = %request.url, "Offline with no cached copy");
                        Ok(Self::offline_placeholder())
                    }
                }
            }
        }
    }

    /// Store a duplicated response without making the caller wait.
    /// Failures are logged and dropped; the settlement report goes onto the
    /// internal channel either way.
    fn spawn_refresh(&self, request: Request, response: Response) {
        let storage = Arc::clone(&self.storage);
        let cache_name = self.config.cache_name.clone();
        let tx = self.store_tx.clone();

        tokio::spawn(async move {
            let key = request.cache_key();
            let result: Result<(), CacheError> = async {
                let generation = storage.open(&cache_name).await?;
                generation.put(&request, response).await
            }
            .await;

            let report = match result {
                Ok(()) => StoreReport::Stored { request_key: key },
                Err(err) => {
                    debug!(key = %key, error = %err, "Background cache refresh failed");
                    StoreReport::Failed {
                        request_key: key,
                        error: err.to_string(),
                    }
                }
            };
            // Nobody listening is fine; the store already settled.
            let _ = tx.send(report);
        });
    }

    /// Cache lookup for the fallback path. Backend errors count as misses.
    async fn lookup_cached(&self, request: &Request) -> Option<Response> {
        let generation = match self.storage.open(&self.config.cache_name).await {
            Ok(generation) => generation,
            Err(err) => {
                debug!(error = %err, "Cache open failed during fallback");
                return None;
            }
        };
        match generation.match_request(request).await {
            Ok(hit) => hit,
            Err(err) => {
                debug!(url = %request.url, error = %err, "Cache lookup failed during fallback");
                None
            }
        }
    }

    /// Explicit offline response for the double-miss case, instead of an
    /// unresolved load.
    fn offline_placeholder() -> Response {
        Response::new(503)
            .with_header("content-type", "text/plain; charset=utf-8")
            .with_body(b"offline: resource not cached".to_vec())
    }

    /// Await the next background-store settlement. Test hook: without it,
    /// asserting on the refreshed cache races the fire-and-forget write.
    pub async fn next_store_report(&self) -> Option<StoreReport> {
        self.store_rx.lock().await.recv().await
    }
}

// ============================================================================
// Tests
// ============================================================================
