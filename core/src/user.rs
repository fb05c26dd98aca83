//! Registered users, roles and account status.

use crate::error::{DomainError, Result};
use crate::ids::UserId;
use crate::validation::{validate_email, validate_length, validate_required};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Authorization role
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Regular customer
    User,
    /// Full administrator
    Admin,
    /// Manages the catalog
    ProductAdmin,
    /// Manages orders
    OrderAdmin,
}

impl Role {
    /// All roles.
    pub const ALL: [Self; 4] = [Self::User, Self::Admin, Self::ProductAdmin, Self::OrderAdmin];

    /// Upper-case name used in storage, tokens and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
            Self::ProductAdmin => "PRODUCT_ADMIN",
            Self::OrderAdmin => "ORDER_ADMIN",
        }
    }

    /// Any administrative role.
    #[must_use]
    pub const fn has_admin_privileges(self) -> bool {
        !matches!(self, Self::User)
    }

    /// May create and edit products and categories.
    #[must_use]
    pub const fn can_manage_products(self) -> bool {
        matches!(self, Self::Admin | Self::ProductAdmin)
    }

    /// May move orders through fulfilment.
    #[must_use]
    pub const fn can_manage_orders(self) -> bool {
        matches!(self, Self::Admin | Self::OrderAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::InvalidInput(format!("unknown role '{s}'")))
    }
}

/// Account status
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    /// May log in
    Active,
    /// Locked out
    Inactive,
}

impl UserStatus {
    /// Upper-case name used in storage and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        [Self::Active, Self::Inactive]
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::InvalidInput(format!("unknown user status '{s}'")))
    }
}

/// Validates a display name.
///
/// # Errors
///
/// Returns [`DomainError::InvalidInput`] if the name is blank or too long.
pub fn validate_name(name: &str) -> Result<()> {
    validate_required("name", name, 100)
}

/// Validates an optional phone number.
///
/// # Errors
///
/// Returns [`DomainError::InvalidInput`] if the number is too long.
pub fn validate_phone(phone: Option<&str>) -> Result<()> {
    phone.map_or(Ok(()), |phone| validate_length("phone", phone, 0, 20))
}

/// A registered user.
///
/// Not serializable: API responses map it to their own DTOs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    /// User identifier
    pub id: UserId,
    /// Login email, unique
    pub email: String,
    /// Display name
    pub name: String,
    /// Password hash
    pub password_hash: String,
    /// Contact phone
    pub phone: Option<String>,
    /// Account status
    pub status: UserStatus,
    /// Authorization role
    pub role: Role,
    /// Registration time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates an active user with the `USER` role.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the email, name or phone is malformed.
    pub fn register(
        id: UserId,
        email: String,
        name: String,
        password_hash: String,
        phone: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        validate_email(&email)?;
        validate_name(&name)?;
        validate_phone(phone.as_deref())?;
        Ok(Self {
            id,
            email,
            name,
            password_hash,
            phone,
            status: UserStatus::Active,
            role: Role::User,
            created_at: now,
            updated_at: now,
        })
    }

    /// Updates name and phone.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name or phone is malformed.
    pub fn update_profile(
        &mut self,
        name: String,
        phone: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        validate_name(&name)?;
        validate_phone(phone.as_deref())?;
        self.name = name;
        self.phone = phone;
        self.updated_at = now;
        Ok(())
    }

    /// Returns true if the account may log in.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Unlocks the account.
    pub const fn activate(&mut self) {
        self.status = UserStatus::Active;
    }

    /// Locks the account.
    pub const fn deactivate(&mut self) {
        self.status = UserStatus::Inactive;
    }

    /// See [`Role::has_admin_privileges`].
    #[must_use]
    pub const fn has_admin_privileges(&self) -> bool {
        self.role.has_admin_privileges()
    }

    /// See [`Role::can_manage_products`].
    #[must_use]
    pub const fn can_manage_products(&self) -> bool {
        self.role.can_manage_products()
    }

    /// See [`Role::can_manage_orders`].
    #[must_use]
    pub const fn can_manage_orders(&self) -> bool {
        self.role.can_manage_orders()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn role_privileges() {
        assert!(!Role::User.has_admin_privileges());
        assert!(Role::OrderAdmin.has_admin_privileges());
        assert!(Role::ProductAdmin.can_manage_products());
        assert!(!Role::ProductAdmin.can_manage_orders());
        assert!(Role::Admin.can_manage_orders());
        assert_eq!("product_admin".parse::<Role>().unwrap(), Role::ProductAdmin);
    }

    #[test]
    fn register_validates_email() {
        let result = User::register(
            UserId::new(1),
            "not-an-email".into(),
            "Ann".into(),
            "hash".into(),
            None,
            Utc::now(),
        );
        assert!(matches!(result, Err(DomainError::InvalidEmail(_))));
    }

    #[test]
    fn new_user_is_active_customer() {
        let mut user = User::register(
            UserId::new(1),
            "ann@example.com".into(),
            "Ann".into(),
            "hash".into(),
            Some("555-0100".into()),
            Utc::now(),
        )
        .unwrap();
        assert!(user.is_active());
        assert_eq!(user.role, Role::User);
        user.deactivate();
        assert!(!user.is_active());
    }
}
