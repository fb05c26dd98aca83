//! JWT access and refresh tokens.
//!
//! Tokens are HS256-signed. Expiry is checked against the injected
//! [`Clock`] rather than the system time, so tests can move time forward.

use crate::config::JwtConfig;
use crate::error::{AuthError, Result};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use shopfront_core::environment::Clock;
use shopfront_core::ids::UserId;
use shopfront_core::user::{Role, User};
use std::sync::Arc;

/// Purpose of a token.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Authenticates API requests
    Access,
    /// Exchanged for a new token pair
    Refresh,
}

impl TokenType {
    /// Lower-case name as carried in the `token_type` claim.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

/// Token claims.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// User email
    pub email: String,
    /// User role
    pub role: Role,
    /// Access or refresh
    pub token_type: TokenType,
    /// Issuer
    pub iss: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
    /// Unique token id
    pub jti: String,
}

/// The authenticated caller of a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    /// User id
    pub user_id: UserId,
    /// User email
    pub email: String,
    /// User role
    pub role: Role,
}

impl TryFrom<Claims> for Principal {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self> {
        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidToken(format!("bad subject '{}'", claims.sub)))?;
        Ok(Self {
            user_id: UserId::new(id),
            email: claims.email,
            role: claims.role,
        })
    }
}

/// Issues and validates JWTs.
#[derive(Clone)]
pub struct JwtTokenProvider {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock: Arc<dyn Clock>,
}

impl JwtTokenProvider {
    /// Create a provider from configuration.
    #[must_use]
    pub fn new(config: JwtConfig, clock: Arc<dyn Clock>) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
            clock,
        }
    }

    /// Access token lifetime in seconds.
    #[must_use]
    pub fn access_token_ttl_secs(&self) -> i64 {
        self.config.access_token_ttl.num_seconds()
    }

    /// Issue an access token for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenEncoding`] if signing fails.
    pub fn generate_access_token(&self, user: &User) -> Result<String> {
        self.generate(user, TokenType::Access)
    }

    /// Issue a refresh token for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenEncoding`] if signing fails.
    pub fn generate_refresh_token(&self, user: &User) -> Result<String> {
        self.generate(user, TokenType::Refresh)
    }

    fn generate(&self, user: &User, token_type: TokenType) -> Result<String> {
        let now = self.clock.now();
        let ttl = match token_type {
            TokenType::Access => self.config.access_token_ttl,
            TokenType::Refresh => self.config.refresh_token_ttl,
        };
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            token_type,
            iss: self.config.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenEncoding(e.to_string()))
    }

    /// Verify signature, issuer and expiry, and return the claims.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] if the token is malformed, wrongly
    /// signed, from another issuer, or expired.
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_issuer(&[self.config.issuer.as_str()]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?
            .claims;

        if claims.exp <= self.clock.now().timestamp() {
            return Err(AuthError::InvalidToken("token has expired".to_string()));
        }
        Ok(claims)
    }

    /// Validate a token and require it to be of `expected` type.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] or [`AuthError::WrongTokenType`].
    pub fn validate_token_of_type(&self, token: &str, expected: TokenType) -> Result<Claims> {
        let claims = self.validate_token(token)?;
        if claims.token_type != expected {
            return Err(AuthError::WrongTokenType {
                expected: expected.as_str(),
            });
        }
        Ok(claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use shopfront_testing::{FixedClock, fixtures, test_clock};

    fn provider(clock: &FixedClock) -> JwtTokenProvider {
        JwtTokenProvider::new(JwtConfig::new("test-secret"), Arc::new(clock.clone()))
    }

    #[test]
    fn access_token_round_trips_claims() {
        let clock = test_clock();
        let tokens = provider(&clock);
        let user = fixtures::user(42, "ann@example.com", Role::OrderAdmin, clock.now());

        let token = tokens.generate_access_token(&user).unwrap();
        let claims = tokens.validate_token(&token).unwrap();

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.role, Role::OrderAdmin);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.iss, "shopfront");
        assert_eq!(claims.exp - claims.iat, 86_400);

        let principal = Principal::try_from(claims).unwrap();
        assert_eq!(principal.user_id, UserId::new(42));
    }

    #[test]
    fn expired_token_is_rejected() {
        let clock = test_clock();
        let tokens = provider(&clock);
        let user = fixtures::user(1, "ann@example.com", Role::User, clock.now());
        let token = tokens.generate_access_token(&user).unwrap();

        clock.advance(Duration::hours(24));
        assert!(matches!(
            tokens.validate_token(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let clock = test_clock();
        let user = fixtures::user(1, "ann@example.com", Role::User, clock.now());
        let forged = JwtTokenProvider::new(JwtConfig::new("other"), Arc::new(clock.clone()))
            .generate_access_token(&user)
            .unwrap();

        assert!(provider(&clock).validate_token(&forged).is_err());
        assert!(provider(&clock).validate_token("garbage").is_err());
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let clock = test_clock();
        let tokens = provider(&clock);
        let user = fixtures::user(1, "ann@example.com", Role::User, clock.now());
        let refresh = tokens.generate_refresh_token(&user).unwrap();

        assert_eq!(
            tokens.validate_token_of_type(&refresh, TokenType::Access),
            Err(AuthError::WrongTokenType { expected: "access" })
        );
        let claims = tokens
            .validate_token_of_type(&refresh, TokenType::Refresh)
            .unwrap();
        assert_eq!(claims.exp - claims.iat, 604_800);
    }
}
