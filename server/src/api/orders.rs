//! Checkout and order lifecycle endpoints.
//!
//! Customers see and act on their own orders. Order managers (`ADMIN`,
//! `ORDER_ADMIN`) see every order and drive payment and fulfilment.
//! Placing or cancelling an order moves stock, so both evict the products
//! cache.

use crate::auth::{AuthUser, RequireOrderManager};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use shopfront_auth::Principal;
use shopfront_cache::config::PRODUCTS;
use shopfront_commerce::PlaceOrder;
use shopfront_core::error::DomainError;
use shopfront_core::ids::OrderId;
use shopfront_core::order::{Order, OrderStatus};
use shopfront_core::paging::{Page, PageRequest};
use shopfront_core::providers::OrderQuery;
use shopfront_web::{ApiJson, ApiPath, ApiQuery, ApiResponse, PageParams, WebResult};

/// Listing filters.
#[derive(Debug, Default, Deserialize)]
pub struct OrderFilter {
    /// Only this status
    pub status: Option<OrderStatus>,
    /// Zero-based page
    pub page: Option<u32>,
    /// Page size
    pub size: Option<u32>,
}

impl OrderFilter {
    fn page(&self) -> PageRequest {
        PageRequest::from(PageParams {
            page: self.page,
            size: self.size,
        })
    }
}

/// Status change body.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    /// Target status
    pub status: OrderStatus,
}

/// Load an order the caller may see: their own, or any for a manager.
async fn visible_order(state: &AppState, principal: &Principal, id: OrderId) -> WebResult<Order> {
    let order = state.orders.find_by_id(id).await?;
    if order.is_owned_by(principal.user_id) || principal.role.can_manage_orders() {
        Ok(order)
    } else {
        tracing::warn!(order_id = %id, user_id = %principal.user_id, "Order access denied");
        Err(DomainError::AccessDenied(format!("order {id} belongs to another user")).into())
    }
}

/// `POST /api/v1/orders`
pub async fn place_order(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PlaceOrder>,
) -> WebResult<(StatusCode, ApiResponse<Order>)> {
    let order = state.orders.place_order(principal.user_id, request).await?;
    state.cache.evict_all(PRODUCTS).await;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok_with_message(order, "Order placed"),
    ))
}

/// `GET /api/v1/orders?status&page&size`, the caller's own orders.
pub async fn my_orders(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<OrderFilter>,
) -> WebResult<ApiResponse<Page<Order>>> {
    let query = OrderQuery {
        user_id: Some(principal.user_id),
        status: filter.status,
        created_after: None,
    };
    Ok(ApiResponse::ok(
        state.orders.find_matching(&query, filter.page()).await?,
    ))
}

/// `GET /api/v1/orders/:id`
pub async fn get_order(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> WebResult<ApiResponse<Order>> {
    Ok(ApiResponse::ok(visible_order(&state, &principal, id).await?))
}

/// `PUT /api/v1/orders/:id/confirm`, owner only.
pub async fn confirm_order(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> WebResult<ApiResponse<Order>> {
    let order = state.orders.find_by_id(id).await?;
    if !order.is_owned_by(principal.user_id) {
        return Err(
            DomainError::AccessDenied("only the customer may confirm an order".to_string()).into(),
        );
    }
    Ok(ApiResponse::ok(state.orders.confirm(id).await?))
}

/// `PUT /api/v1/orders/:id/cancel`, owner or order manager.
pub async fn cancel_order(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> WebResult<ApiResponse<Order>> {
    visible_order(&state, &principal, id).await?;
    let order = state.orders.cancel(id).await?;
    state.cache.evict_all(PRODUCTS).await;
    Ok(ApiResponse::ok_with_message(order, "Order cancelled"))
}

/// `PUT /api/v1/orders/:id/pay`
pub async fn pay_order(
    RequireOrderManager(_): RequireOrderManager,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> WebResult<ApiResponse<Order>> {
    Ok(ApiResponse::ok(state.orders.pay(id).await?))
}

/// `PUT /api/v1/orders/:id/ship`
pub async fn ship_order(
    RequireOrderManager(_): RequireOrderManager,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> WebResult<ApiResponse<Order>> {
    Ok(ApiResponse::ok(state.orders.ship(id).await?))
}

/// `PUT /api/v1/orders/:id/deliver`
pub async fn deliver_order(
    RequireOrderManager(_): RequireOrderManager,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> WebResult<ApiResponse<Order>> {
    Ok(ApiResponse::ok(state.orders.deliver(id).await?))
}

/// `PUT /api/v1/orders/:id/status`
pub async fn update_status(
    RequireOrderManager(principal): RequireOrderManager,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> WebResult<ApiResponse<Order>> {
    let order = state.orders.update_status(id, update.status).await?;
    if update.status == OrderStatus::Cancelled {
        state.cache.evict_all(PRODUCTS).await;
    }
    tracing::info!(
        order_id = %id,
        status = %update.status,
        by = %principal.user_id,
        "Order status set via API"
    );
    Ok(ApiResponse::ok(order))
}

/// `GET /api/v1/orders/admin/all?status&page&size`
pub async fn all_orders(
    RequireOrderManager(_): RequireOrderManager,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<OrderFilter>,
) -> WebResult<ApiResponse<Page<Order>>> {
    let query = OrderQuery {
        status: filter.status,
        ..OrderQuery::default()
    };
    Ok(ApiResponse::ok(
        state.orders.find_matching(&query, filter.page()).await?,
    ))
}

/// `GET /api/v1/orders/admin/status/:status`
pub async fn orders_by_status(
    RequireOrderManager(_): RequireOrderManager,
    State(state): State<AppState>,
    ApiPath(status): ApiPath<OrderStatus>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> WebResult<ApiResponse<Page<Order>>> {
    Ok(ApiResponse::ok(
        state
            .orders
            .find_by_status(status, PageRequest::from(params))
            .await?,
    ))
}
