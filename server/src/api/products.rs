//! Product catalog endpoints.
//!
//! Reads by id and SKU go through the `products` cache. Any catalog write
//! evicts the whole cache, since one product may sit under several keys.

use crate::auth::RequireProductManager;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use shopfront_cache::config::PRODUCTS;
use shopfront_core::ids::{CategoryId, ProductId};
use shopfront_core::money::Money;
use shopfront_core::paging::{Page, PageRequest};
use shopfront_core::product::{Product, ProductDraft, ProductStatus};
use shopfront_core::providers::ProductQuery;
use shopfront_web::{ApiJson, ApiPath, ApiQuery, ApiResponse, PageParams, WebResult};

const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;
const DEFAULT_POPULAR_LIMIT: u32 = 10;
const MAX_POPULAR_LIMIT: u32 = 100;

/// Listing filters. Prices are in cents.
#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    /// Case-insensitive match on name or description
    pub keyword: Option<String>,
    /// Only this status
    pub status: Option<ProductStatus>,
    /// Only this category
    pub category_id: Option<CategoryId>,
    /// Lowest price, inclusive
    pub min_price: Option<Money>,
    /// Highest price, inclusive
    pub max_price: Option<Money>,
    /// Zero-based page
    pub page: Option<u32>,
    /// Page size
    pub size: Option<u32>,
}

impl ProductFilter {
    fn into_parts(self) -> (ProductQuery, PageRequest) {
        let page = PageRequest::from(PageParams {
            page: self.page,
            size: self.size,
        });
        let query = ProductQuery {
            keyword: self.keyword,
            status: self.status,
            category_id: self.category_id,
            min_price: self.min_price,
            max_price: self.max_price,
        };
        (query, page)
    }
}

/// `?threshold=` for the low-stock report.
#[derive(Debug, Default, Deserialize)]
pub struct LowStockParams {
    /// Stock at or below this counts as low
    pub threshold: Option<i32>,
}

/// `?limit=` for the popularity report.
#[derive(Debug, Default, Deserialize)]
pub struct PopularParams {
    /// How many products to return
    pub limit: Option<u32>,
}

/// Stock adjustment body.
#[derive(Debug, Deserialize)]
pub struct StockUpdate {
    /// Units to add, or remove when negative
    pub delta: i32,
}

async fn evict_products(state: &AppState) {
    state.cache.evict_all(PRODUCTS).await;
}

/// `GET /api/v1/products`
pub async fn list_products(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> WebResult<ApiResponse<Page<Product>>> {
    let (query, page) = filter.into_parts();
    Ok(ApiResponse::ok(state.products.find_matching(query, page).await?))
}

/// `GET /api/v1/products/:id`
///
/// Counts a view on every call. A cached copy, if any, is served as is, so
/// its view count may trail the stored one until the entry expires.
pub async fn get_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> WebResult<ApiResponse<Product>> {
    let viewed = state.products.increase_view_count(id).await?;

    let key = id.to_string();
    if let Some(product) = state.cache.get::<Product>(PRODUCTS, &key).await {
        return Ok(ApiResponse::ok(product));
    }
    state.cache.put(PRODUCTS, &key, &viewed).await;
    Ok(ApiResponse::ok(viewed))
}

/// `GET /api/v1/products/sku/:sku`
pub async fn get_product_by_sku(
    State(state): State<AppState>,
    ApiPath(sku): ApiPath<String>,
) -> WebResult<ApiResponse<Product>> {
    let key = format!("sku:{sku}");
    if let Some(product) = state.cache.get::<Product>(PRODUCTS, &key).await {
        return Ok(ApiResponse::ok(product));
    }
    let product = state.products.find_by_sku(&sku).await?;
    state.cache.put(PRODUCTS, &key, &product).await;
    Ok(ApiResponse::ok(product))
}

/// `GET /api/v1/products/low-stock?threshold`
pub async fn low_stock(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<LowStockParams>,
) -> WebResult<ApiResponse<Vec<Product>>> {
    let threshold = params.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    Ok(ApiResponse::ok(state.products.find_low_stock(threshold).await?))
}

/// `GET /api/v1/products/popular?limit`
pub async fn popular(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PopularParams>,
) -> WebResult<ApiResponse<Vec<Product>>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_POPULAR_LIMIT)
        .clamp(1, MAX_POPULAR_LIMIT);
    Ok(ApiResponse::ok(state.products.find_popular(limit).await?))
}

/// `POST /api/v1/products`
pub async fn create_product(
    RequireProductManager(principal): RequireProductManager,
    State(state): State<AppState>,
    ApiJson(draft): ApiJson<ProductDraft>,
) -> WebResult<(StatusCode, ApiResponse<Product>)> {
    let product = state.products.create(draft).await?;
    evict_products(&state).await;
    tracing::info!(product_id = %product.id, by = %principal.user_id, "Product created via API");
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok_with_message(product, "Product created"),
    ))
}

/// `PUT /api/v1/products/:id`
pub async fn update_product(
    RequireProductManager(_): RequireProductManager,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(draft): ApiJson<ProductDraft>,
) -> WebResult<ApiResponse<Product>> {
    let product = state.products.update(id, draft).await?;
    evict_products(&state).await;
    Ok(ApiResponse::ok_with_message(product, "Product updated"))
}

/// `DELETE /api/v1/products/:id`
pub async fn delete_product(
    RequireProductManager(principal): RequireProductManager,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> WebResult<ApiResponse<()>> {
    state.products.delete(id).await?;
    evict_products(&state).await;
    tracing::info!(product_id = %id, by = %principal.user_id, "Product deleted via API");
    Ok(ApiResponse::<()>::message("Product deleted"))
}

/// `PUT /api/v1/products/:id/stock`
pub async fn update_stock(
    RequireProductManager(_): RequireProductManager,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(update): ApiJson<StockUpdate>,
) -> WebResult<ApiResponse<Product>> {
    let product = state.products.update_stock(id, update.delta).await?;
    evict_products(&state).await;
    Ok(ApiResponse::ok(product))
}

/// `PUT /api/v1/products/:id/activate`
pub async fn activate_product(
    RequireProductManager(_): RequireProductManager,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> WebResult<ApiResponse<Product>> {
    let product = state.products.activate(id).await?;
    evict_products(&state).await;
    Ok(ApiResponse::ok(product))
}

/// `PUT /api/v1/products/:id/deactivate`
pub async fn deactivate_product(
    RequireProductManager(_): RequireProductManager,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> WebResult<ApiResponse<Product>> {
    let product = state.products.deactivate(id).await?;
    evict_products(&state).await;
    Ok(ApiResponse::ok(product))
}

/// `PUT /api/v1/products/:id/discontinue`
pub async fn discontinue_product(
    RequireProductManager(_): RequireProductManager,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> WebResult<ApiResponse<Product>> {
    let product = state.products.discontinue(id).await?;
    evict_products(&state).await;
    Ok(ApiResponse::ok(product))
}
