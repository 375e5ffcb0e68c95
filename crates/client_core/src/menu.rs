use std::sync::Arc;

use shared::protocol::Product;
use tracing::debug;

use crate::{error::DashboardError, transport::StoreApi};

/// Lists the product catalog as the API returns it.
pub struct MenuLister {
    api: Arc<dyn StoreApi>,
}

impl MenuLister {
    pub fn new(api: Arc<dyn StoreApi>) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<Product>, DashboardError> {
        let products = self
            .api
            .products()
            .await
            .map_err(|source| DashboardError::CatalogFetchFailed { source })?;
        debug!(product_count = products.len(), "menu: fetched catalog");
        Ok(products)
    }
}

#[cfg(test)]
#[path = "tests/menu_tests.rs"]
mod tests;
