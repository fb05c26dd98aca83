//! Registration, profile and user administration.
//!
//! Profiles are cached under `users::{id}`; every write evicts the entry.

use crate::auth::{AuthUser, RequireAdmin};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use shopfront_auth::RegisterUser;
use shopfront_cache::config::USERS;
use shopfront_core::ids::UserId;
use shopfront_core::paging::{Page, PageRequest};
use shopfront_core::providers::UserQuery;
use shopfront_core::user::{Role, User, UserStatus};
use shopfront_core::{DateTime, Utc};
use shopfront_web::{ApiJson, ApiPath, ApiQuery, ApiResponse, PageParams, WebResult};

/// User as returned by the API. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    /// User id
    pub id: UserId,
    /// Login email
    pub email: String,
    /// Display name
    pub name: String,
    /// Contact phone
    pub phone: Option<String>,
    /// Account status
    pub status: UserStatus,
    /// Role
    pub role: Role,
    /// Registration time
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            phone: user.phone,
            status: user.status,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Registration body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Login email
    pub email: String,
    /// Plaintext password
    pub password: String,
    /// Display name
    pub name: String,
    /// Contact phone
    #[serde(default)]
    pub phone: Option<String>,
}

/// Profile update body.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    /// Display name
    pub name: String,
    /// Contact phone
    #[serde(default)]
    pub phone: Option<String>,
}

/// Password change body.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    /// Password currently in use
    pub current_password: String,
    /// Replacement password
    pub new_password: String,
}

/// Admin listing filters.
#[derive(Debug, Default, Deserialize)]
pub struct UserFilter {
    /// Only this role
    pub role: Option<Role>,
    /// Only active (`true`) or inactive (`false`) accounts
    pub active: Option<bool>,
    /// Zero-based page
    pub page: Option<u32>,
    /// Page size
    pub size: Option<u32>,
}

async fn cached_user(state: &AppState, id: UserId) -> WebResult<UserView> {
    let key = id.to_string();
    if let Some(user) = state.cache.get::<UserView>(USERS, &key).await {
        return Ok(user);
    }
    let user = UserView::from(state.users().find_by_id(id).await?);
    state.cache.put(USERS, &key, &user).await;
    Ok(user)
}

async fn evict_user(state: &AppState, id: UserId) {
    state.cache.evict(USERS, &id.to_string()).await;
}

/// `POST /api/v1/users`
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> WebResult<(StatusCode, ApiResponse<UserView>)> {
    let user = state
        .users()
        .register(RegisterUser {
            email: request.email,
            password: request.password,
            name: request.name,
            phone: request.phone,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok_with_message(UserView::from(user), "User registered"),
    ))
}

/// `GET /api/v1/users/me`
pub async fn me(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
) -> WebResult<ApiResponse<UserView>> {
    Ok(ApiResponse::ok(cached_user(&state, principal.user_id).await?))
}

/// `PUT /api/v1/users/me`
pub async fn update_me(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> WebResult<ApiResponse<UserView>> {
    let user = state
        .users()
        .update_profile(principal.user_id, request.name, request.phone)
        .await?;
    evict_user(&state, principal.user_id).await;
    Ok(ApiResponse::ok_with_message(UserView::from(user), "Profile updated"))
}

/// `PUT /api/v1/users/me/password`
pub async fn change_password(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> WebResult<ApiResponse<()>> {
    state
        .users()
        .change_password(
            principal.user_id,
            &request.current_password,
            &request.new_password,
        )
        .await?;
    evict_user(&state, principal.user_id).await;
    Ok(ApiResponse::<()>::message("Password changed"))
}

/// `GET /api/v1/admin/users?role&active&page&size`
pub async fn list_users(
    RequireAdmin(_): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<UserFilter>,
) -> WebResult<ApiResponse<Page<UserView>>> {
    let query = UserQuery {
        role: filter.role,
        status: filter.active.map(|active| {
            if active {
                UserStatus::Active
            } else {
                UserStatus::Inactive
            }
        }),
    };
    let page = PageRequest::from(PageParams {
        page: filter.page,
        size: filter.size,
    });
    let users = state.users().find_matching(&query, page).await?;
    Ok(ApiResponse::ok(users.map(UserView::from)))
}

/// `GET /api/v1/admin/users/:id`
pub async fn get_user(
    RequireAdmin(_): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
) -> WebResult<ApiResponse<UserView>> {
    Ok(ApiResponse::ok(cached_user(&state, id).await?))
}

/// `PUT /api/v1/admin/users/:id/activate`
pub async fn activate_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
) -> WebResult<ApiResponse<UserView>> {
    let user = state.users().activate(id).await?;
    evict_user(&state, id).await;
    tracing::info!(user_id = %id, admin_id = %admin.user_id, "User activated");
    Ok(ApiResponse::ok(UserView::from(user)))
}

/// `PUT /api/v1/admin/users/:id/deactivate`
pub async fn deactivate_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
) -> WebResult<ApiResponse<UserView>> {
    let user = state.users().deactivate(id).await?;
    evict_user(&state, id).await;
    tracing::info!(user_id = %id, admin_id = %admin.user_id, "User deactivated");
    Ok(ApiResponse::ok(UserView::from(user)))
}
