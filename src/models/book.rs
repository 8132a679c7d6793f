//! Book model and quantity reconciliation planning

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{
    author::Author,
    enums::BookCategory,
    reference::{Direction, Publisher},
};
use crate::error::RuleViolation;

/// Largest number of copies a single book may declare
pub const MAX_QUANTITY: i32 = 10_000;

/// Book row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub direction_id: Option<i32>,
    pub publisher_id: Option<i32>,
    /// Universal Decimal Classification, e.g. "004.4"
    pub udc: String,
    /// Library-Bibliographic Classification
    pub bbk: String,
    pub isbn: String,
    /// Declared number of non-deleted copies
    pub quantity: i32,
    pub category: BookCategory,
    pub description: String,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Book with its related records, as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub authors: Vec<Author>,
    pub direction: Option<Direction>,
    pub publisher: Option<Publisher>,
}

/// Book query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Search in title and author last name
    pub search: Option<String>,
    pub publisher_id: Option<i32>,
    pub direction_id: Option<i32>,
    /// `title`, `quantity`, prefixed by `-` for descending order
    pub ordering: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,
    pub author_ids: Vec<i32>,
    pub direction_id: i32,
    pub publisher_id: i32,
    #[validate(length(max = 50, message = "UDC must be at most 50 characters"))]
    #[serde(default)]
    pub udc: String,
    #[validate(length(max = 50, message = "BBK must be at most 50 characters"))]
    #[serde(default)]
    pub bbk: String,
    #[validate(length(max = 20, message = "ISBN must be at most 20 characters"))]
    #[serde(default)]
    pub isbn: String,
    #[validate(range(min = 0, max = 10000, message = "Quantity must be between 0 and 10000"))]
    pub quantity: i32,
    #[serde(default)]
    pub category: BookCategory,
    #[serde(default)]
    pub description: String,
}

/// Update book request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: Option<String>,
    pub author_ids: Option<Vec<i32>>,
    pub direction_id: Option<i32>,
    pub publisher_id: Option<i32>,
    #[validate(length(max = 50, message = "UDC must be at most 50 characters"))]
    pub udc: Option<String>,
    #[validate(length(max = 50, message = "BBK must be at most 50 characters"))]
    pub bbk: Option<String>,
    #[validate(length(max = 20, message = "ISBN must be at most 20 characters"))]
    pub isbn: Option<String>,
    #[validate(range(min = 0, max = 10000, message = "Quantity must be between 0 and 10000"))]
    pub quantity: Option<i32>,
    pub category: Option<BookCategory>,
    pub description: Option<String>,
}

/// What a quantity update does to the copy pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    Unchanged,
    /// Append this many available copies
    Grow(i64),
    /// Retire this many available copies
    Shrink(i64),
}

impl QuantityChange {
    pub fn between(old: i32, new: i32) -> Self {
        let diff = new as i64 - old as i64;
        match diff.signum() {
            1 => QuantityChange::Grow(diff),
            -1 => QuantityChange::Shrink(-diff),
            _ => QuantityChange::Unchanged,
        }
    }
}

/// A decrease may only retire available copies, never borrowed ones
pub fn ensure_can_shrink(requested: i64, available: i64) -> Result<(), RuleViolation> {
    if available < requested {
        return Err(RuleViolation::InsufficientAvailableCopies { requested, available });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_change() {
        assert_eq!(QuantityChange::between(2, 2), QuantityChange::Unchanged);
        assert_eq!(QuantityChange::between(2, 5), QuantityChange::Grow(3));
        assert_eq!(QuantityChange::between(5, 1), QuantityChange::Shrink(4));
        assert_eq!(QuantityChange::between(0, 0), QuantityChange::Unchanged);
    }

    #[test]
    fn test_shrink_needs_enough_available_copies() {
        assert!(ensure_can_shrink(2, 2).is_ok());
        assert!(ensure_can_shrink(1, 3).is_ok());
        assert_eq!(
            ensure_can_shrink(3, 1),
            Err(RuleViolation::InsufficientAvailableCopies { requested: 3, available: 1 })
        );
    }

    #[test]
    fn test_quantity_is_bounded() {
        let update = UpdateBook {
            quantity: Some(MAX_QUANTITY),
            ..Default::default()
        };
        assert!(update.validate().is_ok());

        let update = UpdateBook {
            quantity: Some(2_000_000_000),
            ..Default::default()
        };
        let errors = update.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("quantity"));
    }

    #[test]
    fn test_create_book_rejects_negative_quantity() {
        let request: CreateBook = serde_json::from_value(serde_json::json!({
            "title": "Rust in Action",
            "author_ids": [1],
            "direction_id": 1,
            "publisher_id": 1,
            "quantity": -1
        }))
        .unwrap();
        assert_eq!(request.category, BookCategory::Other);
        assert!(request.validate().is_err());
    }
}
