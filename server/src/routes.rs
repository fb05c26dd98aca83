//! Router configuration for the Shopfront API.

use crate::api::{auth, batch, categories, orders, products, users};
use crate::health::{metrics, readiness_check};
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use shopfront_web::correlation_id_layer;
use shopfront_web::handlers::health_check;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// Business routes live under `/api/v1`; `/health`, `/ready` and
/// `/metrics` sit at the root and need no authentication.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        // Users
        .route("/users", post(users::register))
        .route("/users/me", get(users::me).put(users::update_me))
        .route("/users/me/password", put(users::change_password))
        .route("/admin/users", get(users::list_users))
        .route("/admin/users/:id", get(users::get_user))
        .route("/admin/users/:id/activate", put(users::activate_user))
        .route("/admin/users/:id/deactivate", put(users::deactivate_user))
        // Products
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route("/products/sku/:sku", get(products::get_product_by_sku))
        .route("/products/low-stock", get(products::low_stock))
        .route("/products/popular", get(products::popular))
        .route(
            "/products/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/products/:id/stock", put(products::update_stock))
        .route("/products/:id/activate", put(products::activate_product))
        .route("/products/:id/deactivate", put(products::deactivate_product))
        .route("/products/:id/discontinue", put(products::discontinue_product))
        // Categories
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route("/categories/roots", get(categories::roots))
        .route(
            "/categories/:id",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route("/categories/:id/children", get(categories::children))
        .route("/categories/:id/descendants", get(categories::descendants))
        .route("/categories/:id/activate", put(categories::activate_category))
        .route("/categories/:id/deactivate", put(categories::deactivate_category))
        // Orders
        .route("/orders", get(orders::my_orders).post(orders::place_order))
        .route("/orders/admin/all", get(orders::all_orders))
        .route("/orders/admin/status/:status", get(orders::orders_by_status))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/confirm", put(orders::confirm_order))
        .route("/orders/:id/cancel", put(orders::cancel_order))
        .route("/orders/:id/pay", put(orders::pay_order))
        .route("/orders/:id/ship", put(orders::ship_order))
        .route("/orders/:id/deliver", put(orders::deliver_order))
        .route("/orders/:id/status", put(orders::update_status))
        // Batch
        .route("/batch/jobs", get(batch::list_jobs))
        .route("/batch/jobs/order-report", post(batch::run_order_report))
        .route("/batch/jobs/user-statistics", post(batch::run_user_statistics))
        .route("/batch/jobs/:name/status", get(batch::job_status));

    Router::new()
        // Health checks (no authentication)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
