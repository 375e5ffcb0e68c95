use std::{sync::Arc, time::Duration};

use anyhow::{ensure, Result};
use shared::domain::StoreId;

pub mod aggregator;
pub mod error;
pub mod menu;
pub mod poller;
pub mod transport;
pub mod types;

pub use aggregator::{OrderAggregator, ProductLookup, QueueOrder};
pub use error::{DashboardError, FetchError, TickError};
pub use menu::MenuLister;
pub use poller::{Cadence, PollingView, Refresh, DEFAULT_POLL_INTERVAL};
pub use transport::{HttpStoreApi, StoreApi};
pub use types::{OrderView, ResolvedLineItem, ViewEvent, ViewSnapshot, ViewStats};

pub type OrderQueueView = PollingView<OrderAggregator>;
pub type MenuView = PollingView<MenuLister>;

/// Entry point for the seller views of one store.
///
/// Each call hands out a fresh, inactive view; views do not share state.
#[derive(Clone)]
pub struct SellerDashboard {
    api: Arc<dyn StoreApi>,
    store_id: StoreId,
    poll_interval: Duration,
}

impl SellerDashboard {
    pub fn new(api: Arc<dyn StoreApi>, store_id: StoreId) -> Self {
        Self {
            api,
            store_id,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Dashboard backed by the HTTP API at `base_url`.
    pub fn connect(
        base_url: &str,
        store_id: StoreId,
        request_timeout: Option<Duration>,
    ) -> Result<Self> {
        let api = HttpStoreApi::with_timeout(base_url, request_timeout)?;
        Ok(Self::new(Arc::new(api), store_id))
    }

    /// Rejects a zero interval; the order queues could never tick.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Result<Self> {
        ensure!(!poll_interval.is_zero(), "poll interval must be non-zero");
        self.poll_interval = poll_interval;
        Ok(self)
    }

    pub fn store_id(&self) -> &StoreId {
        &self.store_id
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn api(&self) -> Arc<dyn StoreApi> {
        Arc::clone(&self.api)
    }

    /// Kitchen queue: orders in API order, refreshed every poll interval.
    pub fn back_store(&self) -> OrderQueueView {
        PollingView::new(
            "back_store",
            OrderAggregator::back_of_store(self.api(), self.store_id.clone()),
            Cadence::Every(self.poll_interval),
        )
    }

    /// Counter queue: newest orders first, refreshed every poll interval.
    pub fn front_store(&self) -> OrderQueueView {
        PollingView::new(
            "front_store",
            OrderAggregator::front_of_store(self.api(), self.store_id.clone()),
            Cadence::Every(self.poll_interval),
        )
    }

    /// Product catalog, fetched once per activation.
    pub fn menu(&self) -> MenuView {
        PollingView::new("menu", MenuLister::new(self.api()), Cadence::Once)
    }
}

#[cfg(test)]
#[path = "tests/fakes.rs"]
pub(crate) mod fakes;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
