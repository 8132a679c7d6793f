//! Book return model and fine computation

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::issue::IssueDetails;

/// Days between the due date and the return date, zero when on time
pub fn days_late(due_date: NaiveDate, return_date: NaiveDate) -> i64 {
    (return_date - due_date).num_days().max(0)
}

/// Fine for a late return: `fine_per_day` for every day past the due date
pub fn compute_fine(due_date: NaiveDate, return_date: NaiveDate, fine_per_day: i64) -> Decimal {
    Decimal::from(days_late(due_date, return_date) * fine_per_day)
}

/// Return row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookReturn {
    pub id: i32,
    pub issue_id: i32,
    pub return_date: NaiveDate,
    pub condition: String,
    pub fine: Decimal,
    pub received_by: Option<i32>,
}

/// Return with the issue it closes
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReturnDetails {
    #[serde(flatten)]
    pub record: BookReturn,
    pub issue: IssueDetails,
}

/// Return query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ReturnQuery {
    /// Search in reader last name and inventory number
    pub search: Option<String>,
    pub received_by: Option<i32>,
    /// `return_date` or `-return_date`
    pub ordering: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Register the return of an issued copy
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReturn {
    pub issue_id: i32,
    /// Notes on the state of the returned copy
    #[serde(default)]
    pub condition: String,
}

/// Amend the condition notes of a return
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReturn {
    pub condition: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_no_fine_when_on_time() {
        assert_eq!(compute_fine(date(2024, 5, 10), date(2024, 5, 10), 5), Decimal::ZERO);
        assert_eq!(compute_fine(date(2024, 5, 10), date(2024, 5, 1), 5), Decimal::ZERO);
    }

    #[test]
    fn test_five_days_late_costs_twenty_five() {
        assert_eq!(compute_fine(date(2024, 5, 10), date(2024, 5, 15), 5), Decimal::from(25));
    }

    #[test]
    fn test_very_late_return_is_not_capped() {
        // ten years late
        let fine = compute_fine(date(2014, 1, 1), date(2024, 1, 1), 5);
        assert_eq!(fine, Decimal::from(3652 * 5));
        // NUMERIC(12, 2) column bound
        assert!(fine < Decimal::from(10_000_000_000i64));
    }

    #[test]
    fn test_fine_across_month_boundary() {
        assert_eq!(days_late(date(2024, 2, 27), date(2024, 3, 2)), 4);
        assert_eq!(compute_fine(date(2024, 2, 27), date(2024, 3, 2), 5), Decimal::from(20));
    }
}
