//! Business metrics for catalog and orders.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `shopfront_orders_placed_total` - Orders accepted at checkout
//! - `shopfront_order_revenue_cents_total` - Value of placed orders in cents
//! - `shopfront_order_transitions_total{status}` - Status changes by target status
//! - `shopfront_order_transitions_rejected_total{from,to}` - Transitions refused by the status graph
//! - `shopfront_products_created_total` - Products added to the catalog
//! - `shopfront_stock_units_adjusted_total{direction}` - Units removed or returned

use metrics::describe_counter;

/// Initialize and register all commerce metric descriptions.
///
/// Call once at startup, after the recorder is installed.
pub fn register_commerce_metrics() {
    describe_counter!(
        "shopfront_orders_placed_total",
        "Total number of orders accepted at checkout"
    );
    describe_counter!(
        "shopfront_order_revenue_cents_total",
        "Total value of placed orders in cents"
    );
    describe_counter!(
        "shopfront_order_transitions_total",
        "Order status changes by target status"
    );
    describe_counter!(
        "shopfront_order_transitions_rejected_total",
        "Order status changes refused by the status graph"
    );
    describe_counter!(
        "shopfront_products_created_total",
        "Total number of products added to the catalog"
    );
    describe_counter!(
        "shopfront_stock_units_adjusted_total",
        "Stock units removed (checkout) or returned (cancellation)"
    );

    tracing::info!("Commerce metrics registered");
}
