//! Authentication extractors.
//!
//! Handlers take one of these as an argument to require a caller:
//!
//! - [`AuthUser`]: any valid access token
//! - [`RequireAdmin`]: the `ADMIN` role
//! - [`RequireProductManager`]: `ADMIN` or `PRODUCT_ADMIN`
//! - [`RequireOrderManager`]: `ADMIN` or `ORDER_ADMIN`
//!
//! # Example
//!
//! ```ignore
//! async fn create_product(
//!     RequireProductManager(principal): RequireProductManager,
//!     State(state): State<AppState>,
//! ) -> WebResult<ApiResponse<Product>> {
//!     // principal.role is ADMIN or PRODUCT_ADMIN
//! }
//! ```

use crate::state::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use shopfront_auth::Principal;
use shopfront_core::user::Role;
use shopfront_web::AppError;

/// Bearer token from the `Authorization` header.
///
/// Rejects with 401 if the header is missing or not a bearer token.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unauthorized("Invalid Authorization header format"))?;

        Ok(Self(token.to_string()))
    }
}

/// Authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let principal = state.auth.authenticate_access_token(&token)?;
        Ok(Self(principal))
    }
}

async fn require_role(
    parts: &mut Parts,
    state: &AppState,
    allowed: fn(Role) -> bool,
) -> Result<Principal, AppError> {
    let AuthUser(principal) = AuthUser::from_request_parts(parts, state).await?;
    if !allowed(principal.role) {
        tracing::warn!(
            user_id = %principal.user_id,
            role = %principal.role,
            path = %parts.uri.path(),
            "Insufficient role"
        );
        return Err(AppError::forbidden("Insufficient permissions"));
    }
    Ok(principal)
}

/// Caller with the `ADMIN` role.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, |role| role == Role::Admin)
            .await
            .map(Self)
    }
}

/// Caller allowed to edit the catalog.
#[derive(Debug, Clone)]
pub struct RequireProductManager(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for RequireProductManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::can_manage_products)
            .await
            .map(Self)
    }
}

/// Caller allowed to move orders through fulfilment.
#[derive(Debug, Clone)]
pub struct RequireOrderManager(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for RequireOrderManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::can_manage_orders)
            .await
            .map(Self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    async fn bearer(value: Option<&str>) -> Result<BearerToken, AppError> {
        let mut builder = Request::builder();
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let (mut parts, ()) = builder.body(()).expect("Valid request").into_parts();
        BearerToken::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn bearer_token_is_extracted() {
        let token = bearer(Some("Bearer abc.def.ghi")).await.unwrap();
        assert_eq!(token.0, "abc.def.ghi");
    }

    #[tokio::test]
    async fn missing_or_malformed_header_is_unauthorized() {
        for value in [None, Some("Basic dXNlcjpwdw=="), Some("Bearer ")] {
            let error = bearer(value).await.unwrap_err();
            assert_eq!(error.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
