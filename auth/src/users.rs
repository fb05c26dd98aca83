//! User registration, credentials and account management.

use crate::error::Result;
use crate::password::PasswordHasher;
use shopfront_core::environment::Clock;
use shopfront_core::error::DomainError;
use shopfront_core::ids::UserId;
use shopfront_core::paging::{Page, PageRequest};
use shopfront_core::providers::{UserQuery, UserRepository};
use shopfront_core::user::{Role, User, UserStatus, validate_name};
use shopfront_core::validation::{validate_email, validate_password};
use std::sync::Arc;

/// Registration input.
#[derive(Clone, Debug)]
pub struct RegisterUser {
    /// Login email
    pub email: String,
    /// Plaintext password
    pub password: String,
    /// Display name
    pub name: String,
    /// Contact phone
    pub phone: Option<String>,
}

/// User account operations.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
}

impl UserService {
    /// Creates a new `UserService`.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            hasher,
            clock,
        }
    }

    /// Register a new active user with the `USER` role.
    ///
    /// # Errors
    ///
    /// - `USER_003` for a malformed email
    /// - `USER_004` for a weak password
    /// - `COMMON_001` for a blank name
    /// - `USER_002` if the email is taken
    pub async fn register(&self, input: RegisterUser) -> Result<User> {
        let email = input.email.trim().to_string();
        validate_email(&email)?;
        validate_password(&input.password)?;
        validate_name(&input.name)?;

        if self.users.exists_by_email(&email).await.map_err(DomainError::from)? {
            return Err(DomainError::UserAlreadyExists(email).into());
        }

        let password_hash = self.hasher.hash(&input.password).await?;
        let id = self.users.next_id().await.map_err(DomainError::from)?;
        let user = User::register(
            id,
            email,
            input.name.trim().to_string(),
            password_hash,
            input.phone,
            self.clock.now(),
        )?;
        self.users.save(&user).await.map_err(DomainError::from)?;

        tracing::info!(user_id = %user.id, "User registered");
        metrics::counter!("shopfront_users_registered_total").increment(1);
        Ok(user)
    }

    /// Check an email and password pair.
    ///
    /// # Errors
    ///
    /// - `USER_005` for an unknown email or wrong password
    /// - `USER_006` if the password is right but the account is deactivated
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let user = self
            .users
            .find_by_email(email.trim())
            .await
            .map_err(DomainError::from)?
            .ok_or(DomainError::InvalidCredentials)?;

        // Account state is only revealed to a caller who knows the password.
        if !self.hasher.verify(password, &user.password_hash).await? {
            tracing::info!(user_id = %user.id, "Rejected login with wrong password");
            return Err(DomainError::InvalidCredentials.into());
        }
        if !user.is_active() {
            tracing::info!(user_id = %user.id, "Rejected login for deactivated account");
            return Err(DomainError::AccountLocked.into());
        }
        Ok(user)
    }

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns `USER_001` if no such user exists.
    pub async fn find_by_id(&self, id: UserId) -> Result<User> {
        Ok(self
            .users
            .find_by_id(id)
            .await
            .map_err(DomainError::from)?
            .ok_or_else(|| DomainError::UserNotFound(id.to_string()))?)
    }

    /// Look up a user by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .find_by_email(email.trim())
            .await
            .map_err(DomainError::from)?)
    }

    /// List users matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn find_matching(&self, query: &UserQuery, page: PageRequest) -> Result<Page<User>> {
        Ok(self
            .users
            .find_matching(query, page)
            .await
            .map_err(DomainError::from)?)
    }

    /// List all users.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn find_all(&self, page: PageRequest) -> Result<Page<User>> {
        self.find_matching(&UserQuery::default(), page).await
    }

    /// List users with `role`.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn find_by_role(&self, role: Role, page: PageRequest) -> Result<Page<User>> {
        let query = UserQuery {
            role: Some(role),
            ..UserQuery::default()
        };
        self.find_matching(&query, page).await
    }

    /// List active users.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn find_active(&self, page: PageRequest) -> Result<Page<User>> {
        let query = UserQuery {
            status: Some(UserStatus::Active),
            ..UserQuery::default()
        };
        self.find_matching(&query, page).await
    }

    /// Check whether an email is registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn exists_by_email(&self, email: &str) -> Result<bool> {
        Ok(self
            .users
            .exists_by_email(email.trim())
            .await
            .map_err(DomainError::from)?)
    }

    /// Update name and phone.
    ///
    /// # Errors
    ///
    /// Returns `USER_001` for an unknown user or a validation error.
    pub async fn update_profile(
        &self,
        id: UserId,
        name: String,
        phone: Option<String>,
    ) -> Result<User> {
        let mut user = self.find_by_id(id).await?;
        user.update_profile(name, phone, self.clock.now())?;
        self.save(&user).await?;
        Ok(user)
    }

    /// Replace the password after verifying the current one.
    ///
    /// # Errors
    ///
    /// - `USER_005` if `current` does not match
    /// - `USER_004` if `new` is weak
    pub async fn change_password(&self, id: UserId, current: &str, new: &str) -> Result<User> {
        let mut user = self.find_by_id(id).await?;
        if !self.hasher.verify(current, &user.password_hash).await? {
            return Err(DomainError::InvalidCredentials.into());
        }
        validate_password(new)?;

        user.password_hash = self.hasher.hash(new).await?;
        user.updated_at = self.clock.now();
        self.save(&user).await?;

        tracing::info!(user_id = %id, "Password changed");
        Ok(user)
    }

    /// Unlock an account.
    ///
    /// # Errors
    ///
    /// Returns `USER_001` for an unknown user.
    pub async fn activate(&self, id: UserId) -> Result<User> {
        self.set_status(id, User::activate).await
    }

    /// Lock an account.
    ///
    /// # Errors
    ///
    /// Returns `USER_001` for an unknown user.
    pub async fn deactivate(&self, id: UserId) -> Result<User> {
        self.set_status(id, User::deactivate).await
    }

    async fn set_status(&self, id: UserId, change: fn(&mut User)) -> Result<User> {
        let mut user = self.find_by_id(id).await?;
        change(&mut user);
        user.updated_at = self.clock.now();
        self.save(&user).await?;
        tracing::info!(user_id = %id, status = %user.status, "User status changed");
        Ok(user)
    }

    async fn save(&self, user: &User) -> Result<()> {
        Ok(self.users.save(user).await.map_err(DomainError::from)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use crate::password::BcryptPasswordHasher;
    use shopfront_testing::mocks::InMemoryUserRepository;
    use shopfront_testing::test_clock;

    fn service() -> UserService {
        UserService::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(BcryptPasswordHasher::new(4)),
            Arc::new(test_clock()),
        )
    }

    fn registration(email: &str) -> RegisterUser {
        RegisterUser {
            email: email.to_string(),
            password: "Secr3t!pass".to_string(),
            name: "Ann".to_string(),
            phone: None,
        }
    }

    fn code(result: Result<User>) -> &'static str {
        result.unwrap_err().code()
    }

    #[tokio::test]
    async fn register_then_authenticate() {
        let users = service();
        let user = users.register(registration("ann@example.com")).await.unwrap();
        assert_eq!(user.role, Role::User);
        assert!(user.is_active());
        assert_ne!(user.password_hash, "Secr3t!pass");

        let found = users.authenticate("ann@example.com", "Secr3t!pass").await.unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn register_rejects_bad_input() {
        let users = service();
        assert_eq!(code(users.register(registration("nope")).await), "USER_003");

        let mut weak = registration("ann@example.com");
        weak.password = "short".into();
        assert_eq!(code(users.register(weak).await), "USER_004");

        let mut nameless = registration("ann@example.com");
        nameless.name = "  ".into();
        assert_eq!(code(users.register(nameless).await), "COMMON_001");

        users.register(registration("ann@example.com")).await.unwrap();
        assert_eq!(
            code(users.register(registration("ann@example.com")).await),
            "USER_002"
        );
    }

    #[tokio::test]
    async fn authenticate_failures() {
        let users = service();
        let user = users.register(registration("ann@example.com")).await.unwrap();

        assert_eq!(code(users.authenticate("bob@example.com", "x").await), "USER_005");
        assert_eq!(
            code(users.authenticate("ann@example.com", "Wrong1!pass").await),
            "USER_005"
        );

        users.deactivate(user.id).await.unwrap();
        let locked = users.authenticate("ann@example.com", "Secr3t!pass").await;
        assert_eq!(locked, Err(AuthError::Domain(DomainError::AccountLocked)));
    }

    #[tokio::test]
    async fn wrong_password_on_deactivated_account_looks_like_any_other() {
        let users = service();
        let user = users.register(registration("ann@example.com")).await.unwrap();
        users.deactivate(user.id).await.unwrap();

        assert_eq!(
            code(users.authenticate("ann@example.com", "Wrong1!pass").await),
            "USER_005"
        );
    }

    #[tokio::test]
    async fn change_password_requires_current() {
        let users = service();
        let user = users.register(registration("ann@example.com")).await.unwrap();

        assert_eq!(
            code(users.change_password(user.id, "Wrong1!pass", "N3w!password").await),
            "USER_005"
        );
        assert_eq!(
            code(users.change_password(user.id, "Secr3t!pass", "weak").await),
            "USER_004"
        );

        users
            .change_password(user.id, "Secr3t!pass", "N3w!password")
            .await
            .unwrap();
        assert!(users.authenticate("ann@example.com", "N3w!password").await.is_ok());
        assert!(users.authenticate("ann@example.com", "Secr3t!pass").await.is_err());
    }

    #[tokio::test]
    async fn listings_filter_by_role_and_status() {
        let users = service();
        let ann = users.register(registration("ann@example.com")).await.unwrap();
        users.register(registration("bob@example.com")).await.unwrap();
        users.deactivate(ann.id).await.unwrap();

        let page = PageRequest::default();
        assert_eq!(users.find_all(page).await.unwrap().total_elements, 2);
        assert_eq!(users.find_active(page).await.unwrap().total_elements, 1);
        assert_eq!(
            users.find_by_role(Role::Admin, page).await.unwrap().total_elements,
            0
        );
        assert!(users.exists_by_email("bob@example.com").await.unwrap());
        assert_eq!(code(users.find_by_id(UserId::new(99)).await), "USER_001");
    }

    #[tokio::test]
    async fn update_profile_validates_phone() {
        let users = service();
        let user = users.register(registration("ann@example.com")).await.unwrap();
        let updated = users
            .update_profile(user.id, "Ann B".into(), Some("555-0100".into()))
            .await
            .unwrap();
        assert_eq!(updated.name, "Ann B");
        assert!(
            users
                .update_profile(user.id, "Ann".into(), Some("5".repeat(21)))
                .await
                .is_err()
        );
    }
}
