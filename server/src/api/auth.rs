//! Login and token refresh.

use crate::state::AppState;
use axum::extract::State;
use serde::Deserialize;
use shopfront_auth::AuthResponse;
use shopfront_web::{ApiJson, ApiResponse, WebResult};

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login email
    pub email: String,
    /// Plaintext password
    pub password: String,
}

/// Refresh request body.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token from a previous login
    pub refresh_token: String,
}

/// `POST /api/v1/auth/login`
///
/// Unknown emails and wrong passwords both answer 401 `USER_005`.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> WebResult<ApiResponse<AuthResponse>> {
    let response = state.auth.login(&request.email, &request.password).await?;
    Ok(ApiResponse::ok_with_message(response, "Login successful"))
}

/// `POST /api/v1/auth/refresh`
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> WebResult<ApiResponse<AuthResponse>> {
    let response = state.auth.refresh(&request.refresh_token).await?;
    Ok(ApiResponse::ok(response))
}
