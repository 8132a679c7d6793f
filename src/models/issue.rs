//! Book issue (loan) model and issuance rules

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::{
    enums::{InventoryStatus, Role},
    inventory::Inventory,
    user::UserShort,
};
use crate::error::RuleViolation;

/// Loan state shown in listings and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Issued,
    Overdue,
    Returned,
}

impl LoanStatus {
    pub fn of(due_date: NaiveDate, returned: bool, today: NaiveDate) -> Self {
        if returned {
            LoanStatus::Returned
        } else if due_date < today {
            LoanStatus::Overdue
        } else {
            LoanStatus::Issued
        }
    }
}

/// Due date used when the librarian does not pick one
pub fn default_due_date(today: NaiveDate, loan_period_days: i64) -> NaiveDate {
    today + Duration::days(loan_period_days)
}

/// Facts gathered about a reader and a book before issuing a copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueEligibility {
    pub available_copies: i64,
    pub open_issues: i64,
    pub holds_same_book: bool,
}

impl IssueEligibility {
    /// Checks run in a fixed order: availability, loan limit, duplicate loan
    pub fn check(&self, max_open_issues: i64) -> Result<(), RuleViolation> {
        if self.available_copies < 1 {
            return Err(RuleViolation::NoAvailableCopy);
        }
        if self.open_issues >= max_open_issues {
            return Err(RuleViolation::MaxIssuesReached { max: max_open_issues });
        }
        if self.holds_same_book {
            return Err(RuleViolation::AlreadyHoldsBook);
        }
        Ok(())
    }
}

/// Internal row structure for issue listings
#[derive(Debug, Clone, FromRow)]
pub struct IssueRow {
    pub id: i32,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub issued_by: Option<i32>,
    pub reader_id: i32,
    pub reader_username: String,
    pub reader_first_name: String,
    pub reader_last_name: String,
    pub reader_role: Role,
    pub inventory_id: i32,
    pub inventory_number: Option<String>,
    pub inventory_status: InventoryStatus,
    pub book_id: i32,
    pub book_title: String,
    pub returned: bool,
}

impl IssueRow {
    pub fn into_details(self, today: NaiveDate) -> IssueDetails {
        IssueDetails {
            id: self.id,
            reader: UserShort {
                id: self.reader_id,
                username: self.reader_username,
                first_name: self.reader_first_name,
                last_name: self.reader_last_name,
                role: self.reader_role,
            },
            inventory: Inventory {
                id: self.inventory_id,
                book_id: self.book_id,
                book_title: self.book_title,
                inventory_number: self.inventory_number,
                status: self.inventory_status,
            },
            issued_by: self.issued_by,
            issue_date: self.issue_date,
            due_date: self.due_date,
            status: LoanStatus::of(self.due_date, self.returned, today),
        }
    }
}

/// Issue with reader and copy details
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IssueDetails {
    pub id: i32,
    pub reader: UserShort,
    pub inventory: Inventory,
    pub issued_by: Option<i32>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: LoanStatus,
}

/// Issue query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct IssueQuery {
    /// Search in reader last name and inventory number
    pub search: Option<String>,
    pub reader_id: Option<i32>,
    pub issued_by: Option<i32>,
    /// `issue_date`, `due_date`, prefixed by `-` for descending order
    pub ordering: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Issue a copy of a book to a reader
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateIssue {
    pub reader_id: i32,
    pub book_id: i32,
    /// Defaults to the configured loan period from today
    pub due_date: Option<NaiveDate>,
}

/// Extend or shorten a loan
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateIssue {
    pub due_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_due_date_is_thirty_days_out() {
        assert_eq!(default_due_date(date(2024, 1, 15), 30), date(2024, 2, 14));
    }

    #[test]
    fn test_eligible_reader() {
        let facts = IssueEligibility { available_copies: 1, open_issues: 2, holds_same_book: false };
        assert!(facts.check(3).is_ok());
    }

    #[test]
    fn test_availability_checked_first() {
        let facts = IssueEligibility { available_copies: 0, open_issues: 3, holds_same_book: true };
        assert_eq!(facts.check(3), Err(RuleViolation::NoAvailableCopy));
    }

    #[test]
    fn test_loan_limit_checked_before_duplicate() {
        let facts = IssueEligibility { available_copies: 4, open_issues: 3, holds_same_book: true };
        assert_eq!(facts.check(3), Err(RuleViolation::MaxIssuesReached { max: 3 }));
    }

    #[test]
    fn test_duplicate_book_rejected() {
        let facts = IssueEligibility { available_copies: 1, open_issues: 1, holds_same_book: true };
        assert_eq!(facts.check(3), Err(RuleViolation::AlreadyHoldsBook));
    }

    #[test]
    fn test_loan_status() {
        let today = date(2024, 3, 10);
        assert_eq!(LoanStatus::of(date(2024, 3, 10), false, today), LoanStatus::Issued);
        assert_eq!(LoanStatus::of(date(2024, 3, 9), false, today), LoanStatus::Overdue);
        assert_eq!(LoanStatus::of(date(2024, 3, 1), true, today), LoanStatus::Returned);
    }
}
