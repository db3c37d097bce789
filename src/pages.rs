//! Page-control seam.
//!
//! Activation's last step claims every open application page so they are
//! served by this agent immediately, instead of waiting for their next
//! navigation. Hosts embed their own page tracking behind `PageControl`;
//! the in-process `PageRegistry` ships for hosts and tests that track
//! pages themselves.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

/// Claim-all-open-pages.
#[async_trait]
pub trait PageControl: Send + Sync {
    /// Take control of every open page on behalf of `controller`.
    /// Returns how many pages changed hands.
    async fn claim(&self, controller: &str) -> Result<usize>;
}

/// In-process page table: page id to controlling agent version, if any.
#[derive(Default)]
pub struct PageRegistry {
    pages: RwLock<BTreeMap<u64, Option<String>>>,
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly opened page. New pages start uncontrolled.
    pub async fn register_page(&self, id: u64) {
        self.pages.write().await.insert(id, None);
    }

    pub async fn unregister_page(&self, id: u64) {
        self.pages.write().await.remove(&id);
    }

    pub async fn controller_of(&self, id: u64) -> Option<String> {
        self.pages.read().await.get(&id).cloned().flatten()
    }

    pub async fn page_count(&self) -> usize {
        self.pages.read().await.len()
    }
}

#[async_trait]
impl PageControl for PageRegistry {
    async fn claim(&self, controller: &str) -> Result<usize> {
        let mut pages = self.pages.write().await;
        for owner in pages.values_mut() {
            *owner = Some(controller.to_string());
        }
        info!(controller, pages = pages.len(), "Claimed open pages");
        Ok(pages.len())
    }
}

// ============================================================================
// Tests
// ============================================================================
