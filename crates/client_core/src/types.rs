use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    domain::ProductId,
    protocol::{Order, OrderLine, Product},
};

use crate::error::TickError;

/// An order line joined with the product it references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLineItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: f64,
    pub quantity: u32,
}

impl ResolvedLineItem {
    pub fn new(line: &OrderLine, product: &Product) -> Self {
        Self {
            product_id: line.product_id.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            quantity: line.quantity,
        }
    }

    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

/// An order with every line resolved, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderView {
    pub order: Order,
    pub items: Vec<ResolvedLineItem>,
}

impl OrderView {
    /// Sum of `unit_price * quantity` over the resolved lines.
    pub fn total(&self) -> f64 {
        self.items.iter().map(ResolvedLineItem::line_total).sum()
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSnapshot<T> {
    pub generation: u64,
    pub committed_at: DateTime<Utc>,
    pub data: T,
}

#[derive(Debug, Clone)]
pub enum ViewEvent {
    Committed { generation: u64, entries: usize },
    Failed(TickError),
    Discarded { generation: u64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewStats {
    pub ticks_started: u64,
    pub commits: u64,
    pub failures: u64,
    pub discarded: u64,
}
