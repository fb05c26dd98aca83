//! Error types for authentication and authorization operations.

use shopfront_core::error::DomainError;
use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Authentication failures.
///
/// Business rule violations (unknown user, wrong password, locked account)
/// are carried as [`DomainError`] so they keep their stable error codes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Token Errors
    // ═══════════════════════════════════════════════════════════

    /// Token is malformed, wrongly signed, expired, or from another issuer.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// An access token was used where a refresh token is required, or the
    /// other way around.
    #[error("Invalid token type: expected {expected}")]
    WrongTokenType {
        /// Token type that was required
        expected: &'static str,
    },

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Password hashing or verification failed.
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// Token could not be signed.
    #[error("Token encoding failed: {0}")]
    TokenEncoding(String),

    // ═══════════════════════════════════════════════════════════
    // Domain Errors
    // ═══════════════════════════════════════════════════════════

    /// Business rule violation.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl AuthError {
    /// Stable error code exposed to API clients.
    ///
    /// Token problems share the invalid-credentials code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidToken(_) | Self::WrongTokenType { .. } => "USER_005",
            Self::Hashing(_) | Self::TokenEncoding(_) => "COMMON_002",
            Self::Domain(error) => error.code(),
        }
    }

    /// Returns `true` if the caller failed to authenticate.
    ///
    /// # Examples
    ///
    /// ```
    /// # use shopfront_auth::AuthError;
    /// # use shopfront_core::DomainError;
    /// assert!(AuthError::InvalidToken("expired".into()).is_unauthenticated());
    /// assert!(AuthError::Domain(DomainError::InvalidCredentials).is_unauthenticated());
    /// assert!(!AuthError::Hashing("boom".into()).is_unauthenticated());
    /// ```
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::InvalidToken(_)
                | Self::WrongTokenType { .. }
                | Self::Domain(DomainError::InvalidCredentials)
        )
    }
}

impl From<AuthError> for DomainError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Domain(error) => error,
            AuthError::InvalidToken(_) | AuthError::WrongTokenType { .. } => Self::InvalidCredentials,
            AuthError::Hashing(message) | AuthError::TokenEncoding(message) => {
                Self::Internal(message)
            }
        }
    }
}
