//! Named reference records: directions (book categories) and publishers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Direction (subject area) of a book
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Direction {
    pub id: i32,
    pub name: String,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Publishing house
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Publisher {
    pub id: i32,
    pub name: String,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Table metadata for a named reference record
pub trait NamedRecord {
    const TABLE: &'static str;
    const LABEL: &'static str;
    /// Longest accepted name
    const MAX_NAME: u64;
}

impl NamedRecord for Direction {
    const TABLE: &'static str = "directions";
    const LABEL: &'static str = "Direction";
    const MAX_NAME: u64 = 100;
}

impl NamedRecord for Publisher {
    const TABLE: &'static str = "publishers";
    const LABEL: &'static str = "Publisher";
    const MAX_NAME: u64 = 150;
}

/// Query parameters shared by directions and publishers
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct NameQuery {
    /// Search in name
    pub search: Option<String>,
    /// `name` or `-name`
    pub ordering: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create or update request for directions and publishers
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct NameRequest {
    #[validate(length(min = 1, max = 150, message = "Name must be 1 to 150 characters"))]
    pub name: String,
}

impl NameRequest {
    /// Name check against the record's own limit
    pub fn check_length<T: NamedRecord>(&self) -> Result<(), crate::error::AppError> {
        if self.name.chars().count() as u64 > T::MAX_NAME {
            return Err(crate::error::AppError::Validation(format!(
                "name: {} name must be at most {} characters",
                T::LABEL,
                T::MAX_NAME
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_name_limit() {
        let request = NameRequest { name: "x".repeat(120) };
        assert!(request.validate().is_ok());
        assert!(request.check_length::<Direction>().is_err());
        assert!(request.check_length::<Publisher>().is_ok());
    }
}
