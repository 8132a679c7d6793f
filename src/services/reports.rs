//! Reports service

use chrono::{NaiveDate, Utc};

use crate::{
    error::AppResult,
    models::{
        book_return::{compute_fine, days_late},
        issue::IssueDetails,
        report::{AvailabilityEntry, OverdueEntry, ReaderActivity},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
    fine_per_day: i64,
}

impl ReportsService {
    pub fn new(repository: Repository, fine_per_day: i64) -> Self {
        Self {
            repository,
            fine_per_day,
        }
    }

    /// All books currently out, overdue ones included
    pub async fn issued(&self) -> AppResult<Vec<IssueDetails>> {
        self.repository
            .reports
            .open_issues(Utc::now().date_naive())
            .await
    }

    /// Books past their due date, with the fine accrued so far
    pub async fn overdue(&self) -> AppResult<Vec<OverdueEntry>> {
        let today = Utc::now().date_naive();
        let issues = self.repository.reports.overdue_issues(today).await?;
        Ok(issues
            .into_iter()
            .map(|issue| overdue_entry(issue, today, self.fine_per_day))
            .collect())
    }

    pub async fn availability(&self) -> AppResult<Vec<AvailabilityEntry>> {
        self.repository.reports.availability().await
    }

    pub async fn readers(&self) -> AppResult<Vec<ReaderActivity>> {
        self.repository
            .reports
            .reader_activity(Utc::now().date_naive())
            .await
    }
}

fn overdue_entry(issue: IssueDetails, today: NaiveDate, fine_per_day: i64) -> OverdueEntry {
    OverdueEntry {
        days_overdue: days_late(issue.due_date, today),
        accrued_fine: compute_fine(issue.due_date, today, fine_per_day),
        issue,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::{
        enums::{InventoryStatus, Role},
        inventory::Inventory,
        issue::LoanStatus,
        user::UserShort,
    };

    #[test]
    fn test_overdue_entry_accrues_fine() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 20).unwrap();
        let issue = IssueDetails {
            id: 1,
            reader: UserShort {
                id: 2,
                username: "reader".to_string(),
                first_name: "Asel".to_string(),
                last_name: "Bekova".to_string(),
                role: Role::Reader,
            },
            inventory: Inventory {
                id: 3,
                book_id: 4,
                book_title: "Manas".to_string(),
                inventory_number: Some("INV-00003".to_string()),
                status: InventoryStatus::Borrowed,
            },
            issued_by: Some(5),
            issue_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 6, 13).unwrap(),
            status: LoanStatus::Overdue,
        };

        let entry = overdue_entry(issue, today, 5);
        assert_eq!(entry.days_overdue, 7);
        assert_eq!(entry.accrued_fine, Decimal::from(35));
    }
}
