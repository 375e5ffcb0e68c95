//! Records exchanged with the ordering API.
//!
//! Field names follow the API's JSON (`_id`, `storeID`, `productIDs`, ...);
//! the Rust side uses snake_case names.

use std::num::NonZeroU32;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{OrderId, ProductId, StoreId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub product_id: ProductId,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "__v", default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u32>,
}

/// One `(product, quantity)` entry of an order.
///
/// Older orders list bare product ids instead of objects; those decode
/// with a quantity of one. A quantity of zero is rejected on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OrderLineRepr")]
pub struct OrderLine {
    #[serde(rename = "productId")]
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub line_id: Option<String>,
}

impl OrderLine {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            line_id: None,
        }
    }
}

fn default_quantity() -> NonZeroU32 {
    NonZeroU32::MIN
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OrderLineRepr {
    Bare(ProductId),
    Detailed {
        #[serde(rename = "productId")]
        product_id: ProductId,
        #[serde(default = "default_quantity")]
        quantity: NonZeroU32,
        #[serde(rename = "_id", default)]
        line_id: Option<String>,
    },
}

impl From<OrderLineRepr> for OrderLine {
    fn from(value: OrderLineRepr) -> Self {
        match value {
            OrderLineRepr::Bare(product_id) => Self {
                product_id,
                quantity: default_quantity().get(),
                line_id: None,
            },
            OrderLineRepr::Detailed {
                product_id,
                quantity,
                line_id,
            } => Self {
                product_id,
                quantity: quantity.get(),
                line_id,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id")]
    pub order_id: OrderId,
    #[serde(rename = "storeID")]
    pub store_id: StoreId,
    #[serde(rename = "userID")]
    pub user_id: UserId,
    #[serde(rename = "productIDs", default)]
    pub lines: Vec<OrderLine>,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "paymentStatus", default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "__v", default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u32>,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
