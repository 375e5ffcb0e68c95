use shared::domain::{OrderId, ProductId, StoreId};
use thiserror::Error;

/// Failure of a single request against the ordering API.
///
/// `Clone` so one failed product lookup can be handed to every order that
/// referenced the product during the same tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("invalid response body from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("cannot build request url: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
    #[error("failed to fetch orders for store {store_id}: {source}")]
    OrdersFetchFailed {
        store_id: StoreId,
        source: FetchError,
    },
    #[error("failed to fetch product {product_id} for order {order_id}: {source}")]
    ProductFetchFailed {
        order_id: OrderId,
        product_id: ProductId,
        source: FetchError,
    },
    #[error("failed to fetch product catalog: {source}")]
    CatalogFetchFailed { source: FetchError },
}

/// Error reported at the tick boundary of a polling view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickError {
    #[error("aggregation failed on tick {generation}: {source}")]
    AggregationFailed {
        generation: u64,
        source: DashboardError,
    },
}

impl TickError {
    pub fn generation(&self) -> u64 {
        match self {
            Self::AggregationFailed { generation, .. } => *generation,
        }
    }

    pub fn cause(&self) -> &DashboardError {
        match self {
            Self::AggregationFailed { source, .. } => source,
        }
    }
}
