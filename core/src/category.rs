//! Product categories, organised as a tree.

use crate::error::{DomainError, Result};
use crate::ids::CategoryId;
use crate::validation::{validate_length, validate_required};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a category is shown
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryStatus {
    /// Visible
    Active,
    /// Hidden
    Inactive,
}

impl CategoryStatus {
    /// Upper-case name used in storage and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for CategoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        [Self::Active, Self::Inactive]
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::InvalidInput(format!("unknown category status '{s}'")))
    }
}

/// Fields supplied when creating or updating a category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDraft {
    /// Unique name
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Parent category, `None` for a root
    pub parent_id: Option<CategoryId>,
}

impl CategoryDraft {
    /// Checks field formats.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidInput`] for the first invalid field.
    pub fn validate(&self) -> Result<()> {
        validate_required("name", &self.name, 100)?;
        if let Some(description) = &self.description {
            validate_length("description", description, 0, 500)?;
        }
        Ok(())
    }
}

/// A catalog category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category identifier
    pub id: CategoryId,
    /// Unique name
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Parent category
    pub parent_id: Option<CategoryId>,
    /// Visibility
    pub status: CategoryStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Creates an active category.
    #[must_use]
    pub fn create(id: CategoryId, draft: CategoryDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            parent_id: draft.parent_id,
            status: CategoryStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites editable fields from `draft`.
    pub fn apply(&mut self, draft: CategoryDraft, now: DateTime<Utc>) {
        self.name = draft.name;
        self.description = draft.description;
        self.parent_id = draft.parent_id;
        self.updated_at = now;
    }

    /// Shows the category.
    pub const fn activate(&mut self) {
        self.status = CategoryStatus::Active;
    }

    /// Hides the category.
    pub const fn deactivate(&mut self) {
        self.status = CategoryStatus::Inactive;
    }

    /// Returns true if the category is visible.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == CategoryStatus::Active
    }

    /// Returns true if the category has no parent.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
