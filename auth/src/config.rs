//! Authentication configuration.
//!
//! Values are supplied by the application (see the server's
//! `Config::from_env`), never hardcoded in the auth logic.

use chrono::Duration;

/// JWT signing configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC secret used to sign and verify tokens.
    pub secret: String,

    /// Value of the `iss` claim.
    ///
    /// Default: `shopfront`
    pub issuer: String,

    /// Access token lifetime.
    ///
    /// Default: 24 hours
    pub access_token_ttl: Duration,

    /// Refresh token lifetime.
    ///
    /// Default: 7 days
    pub refresh_token_ttl: Duration,
}

impl JwtConfig {
    /// Create a JWT configuration with default issuer and lifetimes.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Self::default()
        }
    }

    /// Set the issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Set access token lifetime.
    #[must_use]
    pub const fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    /// Set refresh token lifetime.
    #[must_use]
    pub const fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            issuer: "shopfront".to_string(),
            access_token_ttl: Duration::hours(24),
            refresh_token_ttl: Duration::days(7),
        }
    }
}
