//! Plain-text tables for the three views.

use std::fmt::Write as _;

use client_core::OrderView;
use shared::protocol::Product;

/// Kitchen queue: one row per line item, grouped by order.
pub fn back_store(orders: &[OrderView]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<4} {:<26} {:<28} {:>5}", "#", "ORDER", "MENU", "QTY");
    for (index, view) in orders.iter().enumerate() {
        if view.items.is_empty() {
            let _ = writeln!(
                out,
                "{:<4} {:<26} {:<28} {:>5}",
                index + 1,
                view.order.order_id,
                "-",
                0
            );
        }
        for (line, item) in view.items.iter().enumerate() {
            if line == 0 {
                let _ = write!(out, "{:<4} {:<26} ", index + 1, view.order.order_id);
            } else {
                let _ = write!(out, "{:<4} {:<26} ", "", "");
            }
            let _ = writeln!(out, "{:<28} {:>5}", item.name, item.quantity);
        }
    }
    let _ = writeln!(out, "{} order(s)", orders.len());
    out
}

/// Counter queue: items, totals and status per order.
pub fn front_store(orders: &[OrderView]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<26} {:<36} {:>10} {:<14} {:<16}",
        "ORDER", "ITEMS", "TOTAL", "STATUS", "PAYMENT"
    );
    for view in orders {
        let items = view
            .items
            .iter()
            .map(|item| format!("{} x{}", item.name, item.quantity))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            out,
            "{:<26} {:<36} {:>10.2} {:<14} {:<16}",
            view.order.order_id,
            items,
            view.total(),
            view.order.status,
            view.order.payment_status.as_deref().unwrap_or("-"),
        );
    }
    let _ = writeln!(out, "{} order(s)", orders.len());
    out
}

pub fn menu(products: &[Product]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<26} {:<28} {:>10} {:<12}",
        "ID", "NAME", "PRICE", "STATUS"
    );
    for product in products {
        let _ = writeln!(
            out,
            "{:<26} {:<28} {:>10} {:<12}",
            product.product_id, product.name, product.price, product.status
        );
    }
    let _ = writeln!(out, "{} item(s)", products.len());
    out
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
