use std::{collections::HashMap, sync::Arc};

use futures::{
    future::{try_join_all, BoxFuture, Shared},
    FutureExt,
};
use shared::{
    domain::{ProductId, StoreId},
    protocol::{Order, Product},
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    error::{DashboardError, FetchError},
    transport::StoreApi,
    types::{OrderView, ResolvedLineItem},
};

type PendingProduct<'a> = Shared<BoxFuture<'a, Result<Product, FetchError>>>;

/// Product lookups for a single tick.
///
/// Every product id is requested at most once per lookup; later callers
/// await the same in-flight request. Nothing survives the lookup.
pub struct ProductLookup<'a> {
    api: &'a dyn StoreApi,
    pending: Mutex<HashMap<ProductId, PendingProduct<'a>>>,
}

impl<'a> ProductLookup<'a> {
    pub fn new(api: &'a dyn StoreApi) -> Self {
        Self {
            api,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, product_id: &ProductId) -> Result<Product, FetchError> {
        let request = {
            let mut pending = self.pending.lock().await;
            pending
                .entry(product_id.clone())
                .or_insert_with(|| {
                    let api = self.api;
                    let product_id = product_id.clone();
                    async move { api.product(&product_id).await }
                        .boxed()
                        .shared()
                })
                .clone()
        };
        request.await
    }

    /// Number of distinct products requested so far.
    pub async fn requested(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOrder {
    /// Keep the order the API returned (kitchen queue).
    AsReturned,
    /// Reverse the API order so the newest orders come first (counter queue).
    NewestFirst,
}

/// Fetches a store's orders and joins every line against its product.
pub struct OrderAggregator {
    api: Arc<dyn StoreApi>,
    store_id: StoreId,
    ordering: QueueOrder,
}

impl OrderAggregator {
    pub fn new(api: Arc<dyn StoreApi>, store_id: StoreId, ordering: QueueOrder) -> Self {
        Self {
            api,
            store_id,
            ordering,
        }
    }

    pub fn back_of_store(api: Arc<dyn StoreApi>, store_id: StoreId) -> Self {
        Self::new(api, store_id, QueueOrder::AsReturned)
    }

    pub fn front_of_store(api: Arc<dyn StoreApi>, store_id: StoreId) -> Self {
        Self::new(api, store_id, QueueOrder::NewestFirst)
    }

    pub fn store_id(&self) -> &StoreId {
        &self.store_id
    }

    pub fn ordering(&self) -> QueueOrder {
        self.ordering
    }

    /// All-or-nothing: any failed request fails the whole aggregation.
    pub async fn aggregate(&self) -> Result<Vec<OrderView>, DashboardError> {
        let orders = self
            .api
            .store_orders(&self.store_id)
            .await
            .map_err(|source| DashboardError::OrdersFetchFailed {
                store_id: self.store_id.clone(),
                source,
            })?;
        let order_count = orders.len();

        let lookup = ProductLookup::new(self.api.as_ref());
        let mut views = try_join_all(orders.into_iter().map(|order| resolve_order(&lookup, order)))
            .await?;

        if self.ordering == QueueOrder::NewestFirst {
            views.reverse();
        }

        let product_requests = lookup.requested().await;
        debug!(
            store_id = %self.store_id,
            order_count,
            product_requests,
            "aggregator: resolved orders"
        );
        Ok(views)
    }
}

/// Resolves every line of `order`; the first failed product lookup fails the order.
pub async fn resolve_order(
    lookup: &ProductLookup<'_>,
    order: Order,
) -> Result<OrderView, DashboardError> {
    let order_id = &order.order_id;
    let items = try_join_all(order.lines.iter().map(|line| async move {
        let product = lookup.get(&line.product_id).await.map_err(|source| {
            DashboardError::ProductFetchFailed {
                order_id: order_id.clone(),
                product_id: line.product_id.clone(),
                source,
            }
        })?;
        Ok::<_, DashboardError>(ResolvedLineItem::new(line, &product))
    }))
    .await?;

    Ok(OrderView { order, items })
}

#[cfg(test)]
#[path = "tests/aggregator_tests.rs"]
mod tests;
