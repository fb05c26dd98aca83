//! Row to domain mapping.

use crate::db_error;
use shopfront_core::category::Category;
use shopfront_core::error::DomainError;
use shopfront_core::ids::{CategoryId, ProductId, UserId};
use shopfront_core::money::Money;
use shopfront_core::paging::PageRequest;
use shopfront_core::product::Product;
use shopfront_core::providers::{RepositoryError, RepositoryResult};
use shopfront_core::user::User;
use sqlx::Row;
use sqlx::postgres::PgRow;
use std::str::FromStr;

/// Parse a stored enum name.
pub(crate) fn parse<T>(column: &str, value: &str) -> RepositoryResult<T>
where
    T: FromStr<Err = DomainError>,
{
    value
        .parse()
        .map_err(|_| RepositoryError::Corrupt(format!("{column}: unexpected value '{value}'")))
}

/// `LIMIT` and `OFFSET` for a page request.
pub(crate) fn limit_offset(page: PageRequest) -> RepositoryResult<(i64, i64)> {
    let offset = i64::try_from(page.offset())
        .map_err(|_| RepositoryError::Internal("page offset out of range".to_string()))?;
    Ok((i64::from(page.size()), offset))
}

/// A `COUNT(*)` result as an unsigned total.
pub(crate) fn count(row: &PgRow) -> RepositoryResult<u64> {
    let count: i64 = row.try_get(0).map_err(db_error)?;
    u64::try_from(count).map_err(|_| RepositoryError::Corrupt(format!("negative count {count}")))
}

/// `%keyword%` for `ILIKE`.
pub(crate) fn like_pattern(keyword: &str) -> String {
    format!("%{keyword}%")
}

pub(crate) fn user(row: &PgRow) -> RepositoryResult<User> {
    let status: String = row.try_get("status").map_err(db_error)?;
    let role: String = row.try_get("role").map_err(db_error)?;
    Ok(User {
        id: UserId::new(row.try_get("id").map_err(db_error)?),
        email: row.try_get("email").map_err(db_error)?,
        name: row.try_get("name").map_err(db_error)?,
        password_hash: row.try_get("password_hash").map_err(db_error)?,
        phone: row.try_get("phone").map_err(db_error)?,
        status: parse("users.status", &status)?,
        role: parse("users.role", &role)?,
        created_at: row.try_get("created_at").map_err(db_error)?,
        updated_at: row.try_get("updated_at").map_err(db_error)?,
    })
}

pub(crate) fn product(row: &PgRow) -> RepositoryResult<Product> {
    let status: String = row.try_get("status").map_err(db_error)?;
    let category_id: Option<i64> = row.try_get("category_id").map_err(db_error)?;
    Ok(Product {
        id: ProductId::new(row.try_get("id").map_err(db_error)?),
        name: row.try_get("name").map_err(db_error)?,
        description: row.try_get("description").map_err(db_error)?,
        price: Money::from_cents(row.try_get("price_cents").map_err(db_error)?),
        stock_quantity: row.try_get("stock_quantity").map_err(db_error)?,
        category_id: category_id.map(CategoryId::new),
        brand: row.try_get("brand").map_err(db_error)?,
        sku: row.try_get("sku").map_err(db_error)?,
        status: parse("products.status", &status)?,
        view_count: row.try_get("view_count").map_err(db_error)?,
        created_at: row.try_get("created_at").map_err(db_error)?,
        updated_at: row.try_get("updated_at").map_err(db_error)?,
    })
}

pub(crate) fn category(row: &PgRow) -> RepositoryResult<Category> {
    let status: String = row.try_get("status").map_err(db_error)?;
    let parent_id: Option<i64> = row.try_get("parent_id").map_err(db_error)?;
    Ok(Category {
        id: CategoryId::new(row.try_get("id").map_err(db_error)?),
        name: row.try_get("name").map_err(db_error)?,
        description: row.try_get("description").map_err(db_error)?,
        parent_id: parent_id.map(CategoryId::new),
        status: parse("categories.status", &status)?,
        created_at: row.try_get("created_at").map_err(db_error)?,
        updated_at: row.try_get("updated_at").map_err(db_error)?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use shopfront_core::order::OrderStatus;

    #[test]
    fn parse_rejects_unknown_names() {
        assert_eq!(
            parse::<OrderStatus>("orders.status", "SHIPPED").unwrap(),
            OrderStatus::Shipped
        );
        assert!(matches!(
            parse::<OrderStatus>("orders.status", "LOST"),
            Err(RepositoryError::Corrupt(_))
        ));
    }

    #[test]
    fn page_bounds() {
        assert_eq!(limit_offset(PageRequest::new(2, 25)).unwrap(), (25, 50));
        assert_eq!(like_pattern("mug"), "%mug%");
    }
}
