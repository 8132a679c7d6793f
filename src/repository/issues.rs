//! Issues repository: lending copies to readers

use chrono::NaiveDate;
use sqlx::{Pool, Postgres, QueryBuilder};

use super::{books::lock_book, like_pattern, order_clause, Page};
use crate::{
    error::{AppError, AppResult, RuleViolation},
    models::{
        enums::Role,
        issue::{CreateIssue, IssueDetails, IssueEligibility, IssueQuery, IssueRow},
    },
};

/// Issue joined with its reader, copy and book
pub(crate) const ISSUE_SELECT: &str = r#"
    SELECT bi.id, bi.issue_date, bi.due_date, bi.issued_by,
           u.id AS reader_id, u.username AS reader_username,
           u.first_name AS reader_first_name, u.last_name AS reader_last_name,
           u.role AS reader_role,
           i.id AS inventory_id, i.inventory_number, i.status AS inventory_status,
           b.id AS book_id, b.title AS book_title,
           EXISTS(SELECT 1 FROM book_returns r WHERE r.issue_id = bi.id) AS returned
    FROM book_issues bi
    JOIN users u ON u.id = bi.reader_id
    JOIN inventories i ON i.id = bi.inventory_id
    JOIN books b ON b.id = i.book_id
"#;

const ISSUE_ORDERING: &[(&str, &str)] = &[("issue_date", "bi.issue_date"), ("due_date", "bi.due_date")];

#[derive(Clone)]
pub struct IssuesRepository {
    pool: Pool<Postgres>,
}

impl IssuesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a non-deleted issue by ID
    pub async fn get_by_id(&self, id: i32, today: NaiveDate) -> AppResult<IssueDetails> {
        sqlx::query_as::<_, IssueRow>(&format!(
            "{} WHERE bi.id = $1 AND bi.deleted_at IS NULL",
            ISSUE_SELECT
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(|row| row.into_details(today))
        .ok_or_else(|| AppError::NotFound(format!("Issue with id {} not found", id)))
    }

    /// Issues by ID, deleted ones included (used to describe returns)
    pub async fn get_many(&self, ids: &[i32], today: NaiveDate) -> AppResult<Vec<IssueDetails>> {
        let rows = sqlx::query_as::<_, IssueRow>(&format!("{} WHERE bi.id = ANY($1)", ISSUE_SELECT))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| row.into_details(today)).collect())
    }

    fn filtered(select: &str, query: &IssueQuery) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(select);
        qb.push(" WHERE bi.deleted_at IS NULL");

        if let Some(reader_id) = query.reader_id {
            qb.push(" AND bi.reader_id = ").push_bind(reader_id);
        }

        if let Some(issued_by) = query.issued_by {
            qb.push(" AND bi.issued_by = ").push_bind(issued_by);
        }

        if let Some(ref search) = query.search {
            let pattern = like_pattern(search);
            qb.push(" AND (u.last_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR i.inventory_number ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        qb
    }

    /// Search issues with pagination
    pub async fn search(
        &self,
        query: &IssueQuery,
        today: NaiveDate,
    ) -> AppResult<(Vec<IssueDetails>, i64)> {
        let page = Page::new(query.page, query.per_page);

        let total = Self::filtered(
            r#"
            SELECT COUNT(*) FROM book_issues bi
            JOIN users u ON u.id = bi.reader_id
            JOIN inventories i ON i.id = bi.inventory_id
            "#,
            query,
        )
        .build_query_scalar::<i64>()
        .fetch_one(&self.pool)
        .await?;

        let mut qb = Self::filtered(ISSUE_SELECT, query);
        qb.push(" ORDER BY ")
            .push(order_clause(query.ordering.as_deref(), ISSUE_ORDERING, "bi.issue_date DESC"))
            .push(", bi.id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb.build_query_as::<IssueRow>().fetch_all(&self.pool).await?;

        Ok((rows.into_iter().map(|row| row.into_details(today)).collect(), total))
    }

    /// Issue the lowest-numbered available copy of a book to a reader
    pub async fn create(
        &self,
        data: &CreateIssue,
        due_date: NaiveDate,
        issued_by: i32,
        today: NaiveDate,
        max_open_issues: i64,
    ) -> AppResult<IssueDetails> {
        let mut tx = self.pool.begin().await?;

        // Same lock as a quantity decrease on this book
        lock_book(&mut tx, data.book_id).await?;

        let (role, is_active) = sqlx::query_as::<_, (Role, bool)>(
            "SELECT role, is_active FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(data.reader_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", data.reader_id)))?;

        if role != Role::Reader || !is_active {
            return Err(AppError::Validation(format!(
                "User {} is not an active reader",
                data.reader_id
            )));
        }

        let (available_copies, open_issues, holds_same_book) =
            sqlx::query_as::<_, (i64, i64, bool)>(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM inventories
                     WHERE book_id = $2 AND status = 'available'),
                    (SELECT COUNT(*) FROM book_issues bi
                     WHERE bi.reader_id = $1 AND bi.deleted_at IS NULL
                       AND NOT EXISTS (SELECT 1 FROM book_returns r WHERE r.issue_id = bi.id)),
                    EXISTS (SELECT 1 FROM book_issues bi
                            JOIN inventories i ON i.id = bi.inventory_id
                            WHERE bi.reader_id = $1 AND i.book_id = $2 AND bi.deleted_at IS NULL
                              AND NOT EXISTS (SELECT 1 FROM book_returns r WHERE r.issue_id = bi.id))
                "#,
            )
            .bind(data.reader_id)
            .bind(data.book_id)
            .fetch_one(&mut *tx)
            .await?;

        IssueEligibility {
            available_copies,
            open_issues,
            holds_same_book,
        }
        .check(max_open_issues)?;

        let inventory_id: i32 = sqlx::query_scalar(
            r#"
            SELECT id FROM inventories
            WHERE book_id = $1 AND status = 'available'
            ORDER BY id
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(data.book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RuleViolation::NoAvailableCopy)?;

        sqlx::query("UPDATE inventories SET status = 'borrowed' WHERE id = $1")
            .bind(inventory_id)
            .execute(&mut *tx)
            .await?;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO book_issues (reader_id, inventory_id, issue_date, due_date, issued_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(data.reader_id)
        .bind(inventory_id)
        .bind(today)
        .bind(due_date)
        .bind(issued_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            issue_id = id,
            reader_id = data.reader_id,
            book_id = data.book_id,
            inventory_id,
            %due_date,
            "Book issued"
        );
        self.get_by_id(id, today).await
    }

    /// Move the due date of an issue
    pub async fn update_due_date(
        &self,
        id: i32,
        due_date: NaiveDate,
        today: NaiveDate,
    ) -> AppResult<IssueDetails> {
        let result = sqlx::query(
            "UPDATE book_issues SET due_date = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(due_date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Issue with id {} not found", id)));
        }
        self.get_by_id(id, today).await
    }

    /// Soft delete a closed issue
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let returned: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM book_returns r WHERE r.issue_id = bi.id)
            FROM book_issues bi
            WHERE bi.id = $1 AND bi.deleted_at IS NULL
            FOR UPDATE OF bi
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Issue with id {} not found", id)))?;

        if !returned {
            return Err(RuleViolation::IssueStillOpen.into());
        }

        sqlx::query("UPDATE book_issues SET deleted_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
