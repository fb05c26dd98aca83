//! Catalog products.

use crate::error::{DomainError, Result};
use crate::ids::{CategoryId, ProductId};
use crate::money::Money;
use crate::validation::{validate_length, validate_required};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default threshold for low-stock queries.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;

/// Lifecycle of a product in the catalog
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    /// Listed and purchasable
    Active,
    /// Temporarily hidden
    Inactive,
    /// Permanently withdrawn
    Discontinued,
}

impl ProductStatus {
    /// Upper-case name used in storage and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Discontinued => "DISCONTINUED",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        [Self::Active, Self::Inactive, Self::Discontinued]
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::InvalidInput(format!("unknown product status '{s}'")))
    }
}

/// Fields supplied when creating or updating a product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    /// Display name
    pub name: String,
    /// Long description
    pub description: Option<String>,
    /// Unit price
    pub price: Money,
    /// Units on hand
    pub stock_quantity: i32,
    /// Owning category
    pub category_id: Option<CategoryId>,
    /// Manufacturer
    pub brand: Option<String>,
    /// Stock keeping unit, unique across the catalog
    pub sku: String,
}

impl ProductDraft {
    /// Checks field formats.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidInput`] for the first invalid field.
    pub fn validate(&self) -> Result<()> {
        validate_required("name", &self.name, 200)?;
        validate_required("sku", &self.sku, 100)?;
        if let Some(description) = &self.description {
            validate_length("description", description, 0, 2000)?;
        }
        if let Some(brand) = &self.brand {
            validate_length("brand", brand, 0, 100)?;
        }
        if self.price.cents() <= 0 {
            return Err(DomainError::InvalidInput("price must be positive".to_string()));
        }
        if self.stock_quantity < 0 {
            return Err(DomainError::InvalidInput(
                "stock quantity must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// A product in the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Long description
    pub description: Option<String>,
    /// Unit price
    pub price: Money,
    /// Units on hand, never negative
    pub stock_quantity: i32,
    /// Owning category
    pub category_id: Option<CategoryId>,
    /// Manufacturer
    pub brand: Option<String>,
    /// Stock keeping unit
    pub sku: String,
    /// Catalog status
    pub status: ProductStatus,
    /// Number of detail views
    pub view_count: i64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates an active product with no views.
    #[must_use]
    pub fn create(id: ProductId, draft: ProductDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            price: draft.price,
            stock_quantity: draft.stock_quantity,
            category_id: draft.category_id,
            brand: draft.brand,
            sku: draft.sku,
            status: ProductStatus::Active,
            view_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites editable fields from `draft`, keeping status and views.
    pub fn apply(&mut self, draft: ProductDraft, now: DateTime<Utc>) {
        self.name = draft.name;
        self.description = draft.description;
        self.price = draft.price;
        self.stock_quantity = draft.stock_quantity;
        self.category_id = draft.category_id;
        self.brand = draft.brand;
        self.sku = draft.sku;
        self.updated_at = now;
    }

    /// Adjusts stock by `delta`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InsufficientStock`] if stock would go negative.
    pub fn update_stock(&mut self, delta: i32) -> Result<()> {
        let updated = i64::from(self.stock_quantity) + i64::from(delta);
        if updated < 0 {
            return Err(DomainError::InsufficientStock {
                product_id: self.id,
                requested: -i64::from(delta),
                available: i64::from(self.stock_quantity),
            });
        }
        self.stock_quantity = i32::try_from(updated)
            .map_err(|_| DomainError::InvalidInput("stock quantity is too large".to_string()))?;
        Ok(())
    }

    /// Removes `quantity` units from stock.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InsufficientStock`] if fewer units are on hand.
    pub fn decrease_stock(&mut self, quantity: u32) -> Result<()> {
        if i64::from(quantity) > i64::from(self.stock_quantity) {
            return Err(DomainError::InsufficientStock {
                product_id: self.id,
                requested: i64::from(quantity),
                available: i64::from(self.stock_quantity),
            });
        }
        let delta = i32::try_from(quantity)
            .map_err(|_| DomainError::InvalidInput("quantity is too large".to_string()))?;
        self.update_stock(-delta)
    }

    /// Returns `quantity` units to stock.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidInput`] if the stock would overflow.
    pub fn increase_stock(&mut self, quantity: u32) -> Result<()> {
        let delta = i32::try_from(quantity)
            .map_err(|_| DomainError::InvalidInput("quantity is too large".to_string()))?;
        self.update_stock(delta)
    }

    /// Records a detail view.
    pub const fn increase_view_count(&mut self) {
        self.view_count = self.view_count.saturating_add(1);
    }

    /// Active and in stock.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == ProductStatus::Active && self.stock_quantity > 0
    }

    /// Stock at or below `threshold`.
    #[must_use]
    pub const fn is_low_stock(&self, threshold: i32) -> bool {
        self.stock_quantity <= threshold
    }

    /// Makes the product purchasable again.
    pub const fn activate(&mut self) {
        self.status = ProductStatus::Active;
    }

    /// Hides the product.
    pub const fn deactivate(&mut self) {
        self.status = ProductStatus::Inactive;
    }

    /// Withdraws the product permanently.
    pub const fn discontinue(&mut self) {
        self.status = ProductStatus::Discontinued;
    }
}
