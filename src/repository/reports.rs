//! Read-only aggregations for the librarian reports

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use super::issues::ISSUE_SELECT;
use crate::{
    error::AppResult,
    models::{
        issue::{IssueDetails, IssueRow},
        report::{AvailabilityEntry, ReaderActivity, ReaderActivityRow},
    },
};

const OPEN_ISSUE_FILTER: &str = r#"
    WHERE bi.deleted_at IS NULL
      AND NOT EXISTS (SELECT 1 FROM book_returns r WHERE r.issue_id = bi.id)
"#;

#[derive(Clone)]
pub struct ReportsRepository {
    pool: Pool<Postgres>,
}

impl ReportsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Every open issue, soonest due first
    pub async fn open_issues(&self, today: NaiveDate) -> AppResult<Vec<IssueDetails>> {
        let rows = sqlx::query_as::<_, IssueRow>(&format!(
            "{} {} ORDER BY bi.due_date, bi.id",
            ISSUE_SELECT, OPEN_ISSUE_FILTER
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.into_details(today)).collect())
    }

    /// Open issues whose due date is before `today`, most overdue first
    pub async fn overdue_issues(&self, today: NaiveDate) -> AppResult<Vec<IssueDetails>> {
        let rows = sqlx::query_as::<_, IssueRow>(&format!(
            "{} {} AND bi.due_date < $1 ORDER BY bi.due_date, bi.id",
            ISSUE_SELECT, OPEN_ISSUE_FILTER
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.into_details(today)).collect())
    }

    /// Copy counts per non-deleted book
    pub async fn availability(&self) -> AppResult<Vec<AvailabilityEntry>> {
        let entries = sqlx::query_as::<_, AvailabilityEntry>(
            r#"
            SELECT b.id AS book_id, b.title, b.quantity,
                   COUNT(i.id) FILTER (WHERE i.status = 'available') AS available,
                   COUNT(i.id) FILTER (WHERE i.status = 'borrowed') AS borrowed
            FROM books b
            LEFT JOIN inventories i ON i.book_id = b.id
            WHERE b.deleted_at IS NULL
            GROUP BY b.id
            ORDER BY b.title, b.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Issue counts and fines per reader
    pub async fn reader_activity(&self, today: NaiveDate) -> AppResult<Vec<ReaderActivity>> {
        let rows = sqlx::query_as::<_, ReaderActivityRow>(
            r#"
            SELECT u.id, u.username, u.first_name, u.last_name, u.role,
                   COUNT(bi.id) AS total_issues,
                   COUNT(bi.id) FILTER (WHERE r.id IS NULL) AS open_issues,
                   COUNT(bi.id) FILTER (WHERE r.id IS NULL AND bi.due_date < $1) AS overdue_issues,
                   COALESCE(SUM(r.fine) FILTER (WHERE r.deleted_at IS NULL), 0) AS total_fines
            FROM users u
            LEFT JOIN book_issues bi ON bi.reader_id = u.id AND bi.deleted_at IS NULL
            LEFT JOIN book_returns r ON r.issue_id = bi.id
            WHERE u.role = 'reader'
            GROUP BY u.id
            ORDER BY u.last_name, u.first_name, u.id
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ReaderActivity::from).collect())
    }
}
