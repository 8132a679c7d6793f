//! Inventory (physical copy) model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::enums::InventoryStatus;

/// Human-readable copy number derived from the row id, e.g. `INV-00042`
pub fn format_inventory_number(id: i32) -> String {
    format!("INV-{:05}", id)
}

/// Inventory row joined with the title of its book
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Inventory {
    pub id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub inventory_number: Option<String>,
    pub status: InventoryStatus,
}

/// Inventory query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct InventoryQuery {
    /// Search in inventory number and book title
    pub search: Option<String>,
    pub book_id: Option<i32>,
    /// Deleted copies are only listed when explicitly requested
    pub status: Option<InventoryStatus>,
    /// `inventory_number` or `-inventory_number`
    pub ordering: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Add one copy to an existing book
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInventory {
    pub book_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_number_is_zero_padded() {
        assert_eq!(format_inventory_number(1), "INV-00001");
        assert_eq!(format_inventory_number(42), "INV-00042");
        assert_eq!(format_inventory_number(123456), "INV-123456");
    }
}
