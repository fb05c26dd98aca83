//! # Shopfront Authentication
//!
//! Password credentials and stateless JWT sessions.
//!
//! - [`UserService`]: registration, credential checks and account management
//! - [`AuthService`]: login, token refresh and bearer token resolution
//! - [`JwtTokenProvider`]: HS256 access and refresh tokens
//! - [`PasswordHasher`]: one-way hashing, bcrypt in production
//!
//! ## Flow
//!
//! ```text
//! login(email, password) ─▶ { access_token, refresh_token }
//!                                  │                │
//!        Authorization: Bearer ◀───┘                └──▶ refresh() ─▶ new pair
//!                │
//!                ▼
//!   authenticate_access_token() ─▶ Principal { user_id, email, role }
//! ```

pub mod config;
pub mod error;
pub mod password;
pub mod service;
pub mod token;
pub mod users;

pub use config::JwtConfig;
pub use error::{AuthError, Result};
pub use password::{BcryptPasswordHasher, PasswordHasher};
pub use service::{AuthResponse, AuthService, UserInfo};
pub use token::{Claims, JwtTokenProvider, Principal, TokenType};
pub use users::{RegisterUser, UserService};

/// Describe the metrics emitted by this crate.
pub fn register_auth_metrics() {
    metrics::describe_counter!(
        "shopfront_users_registered_total",
        "Total number of user registrations"
    );
    metrics::describe_counter!(
        "shopfront_logins_total",
        "Total number of login attempts by outcome"
    );
}
