//! Category tree endpoints.
//!
//! Single categories and the roots/children lists are cached in
//! `categories`; writes evict the whole cache because a change to one node
//! alters its parent's children list.

use crate::auth::RequireProductManager;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use shopfront_cache::config::CATEGORIES;
use shopfront_core::category::{Category, CategoryDraft, CategoryStatus};
use shopfront_core::ids::CategoryId;
use shopfront_core::paging::{Page, PageRequest};
use shopfront_core::providers::CategoryQuery;
use shopfront_web::{ApiJson, ApiPath, ApiQuery, ApiResponse, PageParams, WebResult};
use std::future::Future;

/// Listing filters.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryFilter {
    /// Case-insensitive match on the name
    pub keyword: Option<String>,
    /// Only this status
    pub status: Option<CategoryStatus>,
    /// Zero-based page
    pub page: Option<u32>,
    /// Page size
    pub size: Option<u32>,
}

async fn cached<T, F, Fut>(state: &AppState, key: &str, load: F) -> WebResult<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned + Sync,
    F: FnOnce() -> Fut,
    Fut: Future<Output = shopfront_core::Result<T>>,
{
    if let Some(value) = state.cache.get::<T>(CATEGORIES, key).await {
        return Ok(value);
    }
    let value = load().await?;
    state.cache.put(CATEGORIES, key, &value).await;
    Ok(value)
}

async fn evict_categories(state: &AppState) {
    state.cache.evict_all(CATEGORIES).await;
}

/// `GET /api/v1/categories?keyword&status&page&size`
pub async fn list_categories(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<CategoryFilter>,
) -> WebResult<ApiResponse<Page<Category>>> {
    let query = CategoryQuery {
        keyword: filter.keyword,
        status: filter.status,
        ..CategoryQuery::default()
    };
    let page = PageRequest::from(PageParams {
        page: filter.page,
        size: filter.size,
    });
    Ok(ApiResponse::ok(
        state.categories.find_matching(query, page).await?,
    ))
}

/// `GET /api/v1/categories/roots`
pub async fn roots(State(state): State<AppState>) -> WebResult<ApiResponse<Vec<Category>>> {
    let roots = cached(&state, "roots", || state.categories.find_roots()).await?;
    Ok(ApiResponse::ok(roots))
}

/// `GET /api/v1/categories/:id`
pub async fn get_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> WebResult<ApiResponse<Category>> {
    let category = cached(&state, &id.to_string(), || state.categories.find_by_id(id)).await?;
    Ok(ApiResponse::ok(category))
}

/// `GET /api/v1/categories/:id/children`
pub async fn children(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> WebResult<ApiResponse<Vec<Category>>> {
    let key = format!("children:{id}");
    let children = cached(&state, &key, || async {
        // Unknown parents are a 404, not an empty list.
        state.categories.find_by_id(id).await?;
        state.categories.find_children(id).await
    })
    .await?;
    Ok(ApiResponse::ok(children))
}

/// `GET /api/v1/categories/:id/descendants`
pub async fn descendants(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> WebResult<ApiResponse<Vec<Category>>> {
    Ok(ApiResponse::ok(state.categories.find_descendants(id).await?))
}

/// `POST /api/v1/categories`
pub async fn create_category(
    RequireProductManager(_): RequireProductManager,
    State(state): State<AppState>,
    ApiJson(draft): ApiJson<CategoryDraft>,
) -> WebResult<(StatusCode, ApiResponse<Category>)> {
    let category = state.categories.create(draft).await?;
    evict_categories(&state).await;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok_with_message(category, "Category created"),
    ))
}

/// `PUT /api/v1/categories/:id`
pub async fn update_category(
    RequireProductManager(_): RequireProductManager,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
    ApiJson(draft): ApiJson<CategoryDraft>,
) -> WebResult<ApiResponse<Category>> {
    let category = state.categories.update(id, draft).await?;
    evict_categories(&state).await;
    Ok(ApiResponse::ok_with_message(category, "Category updated"))
}

/// `DELETE /api/v1/categories/:id`
pub async fn delete_category(
    RequireProductManager(_): RequireProductManager,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> WebResult<ApiResponse<()>> {
    state.categories.delete(id).await?;
    evict_categories(&state).await;
    Ok(ApiResponse::<()>::message("Category deleted"))
}

/// `PUT /api/v1/categories/:id/activate`
pub async fn activate_category(
    RequireProductManager(_): RequireProductManager,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> WebResult<ApiResponse<Category>> {
    let category = state.categories.activate(id).await?;
    evict_categories(&state).await;
    Ok(ApiResponse::ok(category))
}

/// `PUT /api/v1/categories/:id/deactivate`
pub async fn deactivate_category(
    RequireProductManager(_): RequireProductManager,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> WebResult<ApiResponse<Category>> {
    let category = state.categories.deactivate(id).await?;
    evict_categories(&state).await;
    Ok(ApiResponse::ok(category))
}
