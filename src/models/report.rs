//! Read-only report rows

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::{enums::Role, issue::IssueDetails, user::UserShort};

/// Open issue past its due date
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OverdueEntry {
    #[serde(flatten)]
    pub issue: IssueDetails,
    /// today - due_date
    pub days_overdue: i64,
    /// Fine that would be charged if the copy came back today
    pub accrued_fine: Decimal,
}

/// Copy counts for one book
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AvailabilityEntry {
    pub book_id: i32,
    pub title: String,
    pub quantity: i32,
    pub available: i64,
    pub borrowed: i64,
}

/// Internal row structure for the reader activity report
#[derive(Debug, Clone, FromRow)]
pub struct ReaderActivityRow {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub total_issues: i64,
    pub open_issues: i64,
    pub overdue_issues: i64,
    pub total_fines: Decimal,
}

impl From<ReaderActivityRow> for ReaderActivity {
    fn from(row: ReaderActivityRow) -> Self {
        ReaderActivity {
            reader: UserShort {
                id: row.id,
                username: row.username,
                first_name: row.first_name,
                last_name: row.last_name,
                role: row.role,
            },
            total_issues: row.total_issues,
            open_issues: row.open_issues,
            overdue_issues: row.overdue_issues,
            total_fines: row.total_fines,
        }
    }
}

/// Borrowing activity and fines of one reader
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReaderActivity {
    pub reader: UserShort,
    pub total_issues: i64,
    pub open_issues: i64,
    pub overdue_issues: i64,
    pub total_fines: Decimal,
}
