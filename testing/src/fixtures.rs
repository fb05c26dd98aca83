//! Fixture builders for domain values.

use chrono::{DateTime, Utc};
use shopfront_core::category::CategoryDraft;
use shopfront_core::ids::{CategoryId, UserId};
use shopfront_core::money::Money;
use shopfront_core::product::ProductDraft;
use shopfront_core::user::{Role, User, UserStatus};

/// A valid product draft priced at $19.99 with 100 units.
#[must_use]
pub fn product_draft(sku: &str) -> ProductDraft {
    ProductDraft {
        name: format!("Product {sku}"),
        description: Some(format!("Description for {sku}")),
        price: Money::from_cents(1_999),
        stock_quantity: 100,
        category_id: None,
        brand: Some("Acme".to_string()),
        sku: sku.to_string(),
    }
}

/// A valid root category draft.
#[must_use]
pub fn category_draft(name: &str) -> CategoryDraft {
    CategoryDraft {
        name: name.to_string(),
        description: None,
        parent_id: None,
    }
}

/// A valid child category draft.
#[must_use]
pub fn child_category_draft(name: &str, parent: CategoryId) -> CategoryDraft {
    CategoryDraft {
        parent_id: Some(parent),
        ..category_draft(name)
    }
}

/// An active user with the given role and an opaque password hash.
#[must_use]
pub fn user(id: i64, email: &str, role: Role, now: DateTime<Utc>) -> User {
    User {
        id: UserId::new(id),
        email: email.to_string(),
        name: format!("User {id}"),
        password_hash: "not-a-real-hash".to_string(),
        phone: None,
        status: UserStatus::Active,
        role,
        created_at: now,
        updated_at: now,
    }
}
