//! Login, token refresh and request authentication.

use crate::error::{AuthError, Result};
use crate::token::{JwtTokenProvider, Principal, TokenType};
use crate::users::UserService;
use serde::{Deserialize, Serialize};
use shopfront_core::error::DomainError;
use shopfront_core::ids::UserId;
use shopfront_core::user::{Role, User};

/// Identity summary returned with a token pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// User id
    pub id: UserId,
    /// Login email
    pub email: String,
    /// Display name
    pub name: String,
    /// Role
    pub role: Role,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

/// Token pair issued on login or refresh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Bearer token for API requests
    pub access_token: String,
    /// Token exchanged for a new pair
    pub refresh_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// The authenticated user
    pub user: UserInfo,
}

/// Authentication entry points.
#[derive(Clone)]
pub struct AuthService {
    users: UserService,
    tokens: JwtTokenProvider,
}

impl AuthService {
    /// Creates a new `AuthService`.
    #[must_use]
    pub const fn new(users: UserService, tokens: JwtTokenProvider) -> Self {
        Self { users, tokens }
    }

    /// Check credentials and issue a token pair.
    ///
    /// # Errors
    ///
    /// - `USER_005` for an unknown email or wrong password
    /// - `USER_006` for a deactivated account
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let result = self.users.authenticate(email, password).await;
        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!("shopfront_logins_total", "outcome" => outcome).increment(1);

        let user = result?;
        tracing::info!(user_id = %user.id, "User logged in");
        self.issue(&user)
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// # Errors
    ///
    /// - `USER_005` if the token is invalid, expired, or not a refresh token
    /// - `USER_001` if the user no longer exists
    /// - `USER_006` if the account is deactivated
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse> {
        let claims = self
            .tokens
            .validate_token_of_type(refresh_token, TokenType::Refresh)?;
        let principal = Principal::try_from(claims)?;

        let user = self.users.find_by_id(principal.user_id).await?;
        if !user.is_active() {
            return Err(DomainError::AccountLocked.into());
        }
        tracing::debug!(user_id = %user.id, "Refreshed token pair");
        self.issue(&user)
    }

    /// Resolve a bearer access token to the calling principal.
    ///
    /// # Errors
    ///
    /// Returns `USER_005` if the token is invalid, expired, or a refresh
    /// token.
    pub fn authenticate_access_token(&self, token: &str) -> Result<Principal> {
        let claims = self
            .tokens
            .validate_token_of_type(token, TokenType::Access)?;
        Principal::try_from(claims)
    }

    /// The user service backing this instance.
    #[must_use]
    pub const fn users(&self) -> &UserService {
        &self.users
    }

    fn issue(&self, user: &User) -> Result<AuthResponse> {
        Ok(AuthResponse {
            access_token: self.tokens.generate_access_token(user)?,
            refresh_token: self.tokens.generate_refresh_token(user)?,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.access_token_ttl_secs(),
            user: UserInfo::from(user),
        })
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::password::BcryptPasswordHasher;
    use crate::users::RegisterUser;
    use chrono::Duration;
    use shopfront_testing::mocks::InMemoryUserRepository;
    use shopfront_testing::{FixedClock, test_clock};
    use std::sync::Arc;

    async fn setup() -> (AuthService, FixedClock, User) {
        let clock = test_clock();
        let users = UserService::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(BcryptPasswordHasher::new(4)),
            Arc::new(clock.clone()),
        );
        let user = users
            .register(RegisterUser {
                email: "ann@example.com".into(),
                password: "Secr3t!pass".into(),
                name: "Ann".into(),
                phone: None,
            })
            .await
            .unwrap();
        let tokens = JwtTokenProvider::new(JwtConfig::new("test-secret"), Arc::new(clock.clone()));
        (AuthService::new(users, tokens), clock, user)
    }

    #[tokio::test]
    async fn login_issues_bearer_pair() {
        let (auth, _, user) = setup().await;
        let response = auth.login("ann@example.com", "Secr3t!pass").await.unwrap();

        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, 86_400);
        assert_eq!(response.user.id, user.id);
        assert_eq!(response.user.role, Role::User);

        let principal = auth.authenticate_access_token(&response.access_token).unwrap();
        assert_eq!(principal.user_id, user.id);
        assert!(auth.authenticate_access_token(&response.refresh_token).is_err());
    }

    #[tokio::test]
    async fn login_with_wrong_password_fails() {
        let (auth, _, _) = setup().await;
        let err = auth.login("ann@example.com", "nope").await.unwrap_err();
        assert_eq!(err.code(), "USER_005");
    }

    #[tokio::test]
    async fn refresh_requires_refresh_token() {
        let (auth, _, _) = setup().await;
        let pair = auth.login("ann@example.com", "Secr3t!pass").await.unwrap();

        let err = auth.refresh(&pair.access_token).await.unwrap_err();
        assert!(matches!(err, AuthError::WrongTokenType { .. }));
        assert_eq!(err.code(), "USER_005");

        let renewed = auth.refresh(&pair.refresh_token).await.unwrap();
        assert!(auth.authenticate_access_token(&renewed.access_token).is_ok());
    }

    #[tokio::test]
    async fn refresh_rejects_locked_account_and_expired_token() {
        let (auth, clock, user) = setup().await;
        let pair = auth.login("ann@example.com", "Secr3t!pass").await.unwrap();

        auth.users().deactivate(user.id).await.unwrap();
        assert_eq!(
            auth.refresh(&pair.refresh_token).await.unwrap_err().code(),
            "USER_006"
        );

        auth.users().activate(user.id).await.unwrap();
        clock.advance(Duration::days(8));
        assert_eq!(
            auth.refresh(&pair.refresh_token).await.unwrap_err().code(),
            "USER_005"
        );
    }

    #[test]
    fn auth_errors_fold_into_domain_errors() {
        assert_eq!(
            DomainError::from(AuthError::InvalidToken("x".into())),
            DomainError::InvalidCredentials
        );
        assert_eq!(
            DomainError::from(AuthError::Domain(DomainError::AccountLocked)),
            DomainError::AccountLocked
        );
    }
}
