//! Returns repository: closing issues and charging fines

use chrono::NaiveDate;
use sqlx::{Pool, Postgres, QueryBuilder};

use super::{like_pattern, order_clause, Page};
use crate::{
    error::{AppError, AppResult, RuleViolation},
    models::book_return::{compute_fine, BookReturn, CreateReturn, ReturnQuery},
};

const RETURN_ORDERING: &[(&str, &str)] = &[("return_date", "r.return_date")];

#[derive(Clone)]
pub struct ReturnsRepository {
    pool: Pool<Postgres>,
}

impl ReturnsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a non-deleted return by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<BookReturn> {
        sqlx::query_as::<_, BookReturn>(
            "SELECT * FROM book_returns WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Return with id {} not found", id)))
    }

    fn filtered(
        select: &str,
        query: &ReturnQuery,
        reader_id: Option<i32>,
    ) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(select);
        qb.push(
            r#"
            FROM book_returns r
            JOIN book_issues bi ON bi.id = r.issue_id
            JOIN users u ON u.id = bi.reader_id
            JOIN inventories i ON i.id = bi.inventory_id
            WHERE r.deleted_at IS NULL
            "#,
        );

        if let Some(reader_id) = reader_id {
            qb.push(" AND bi.reader_id = ").push_bind(reader_id);
        }

        if let Some(received_by) = query.received_by {
            qb.push(" AND r.received_by = ").push_bind(received_by);
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

    /// Search returns with pagination, optionally limited to one reader's loans
    pub async fn search(
        &self,
        query: &ReturnQuery,
        reader_id: Option<i32>,
    ) -> AppResult<(Vec<BookReturn>, i64)> {
        let page = Page::new(query.page, query.per_page);

        let total = Self::filtered("SELECT COUNT(*) ", query, reader_id)
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = Self::filtered("SELECT r.* ", query, reader_id);
        qb.push(" ORDER BY ")
            .push(order_clause(query.ordering.as_deref(), RETURN_ORDERING, "r.return_date DESC"))
            .push(", r.id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let returns = qb.build_query_as::<BookReturn>().fetch_all(&self.pool).await?;

        Ok((returns, total))
    }

    /// Close an open issue: record the return, charge the fine and free the copy
    pub async fn create(
        &self,
        data: &CreateReturn,
        received_by: i32,
        today: NaiveDate,
        fine_per_day: i64,
    ) -> AppResult<BookReturn> {
        let mut tx = self.pool.begin().await?;

        let (due_date, inventory_id) = sqlx::query_as::<_, (NaiveDate, i32)>(
            r#"
            SELECT due_date, inventory_id FROM book_issues
            WHERE id = $1 AND deleted_at IS NULL
            FOR UPDATE
            "#,
        )
        .bind(data.issue_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Issue with id {} not found", data.issue_id)))?;

        let already_returned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM book_returns WHERE issue_id = $1)",
        )
        .bind(data.issue_id)
        .fetch_one(&mut *tx)
        .await?;

        if already_returned {
            return Err(RuleViolation::AlreadyReturned.into());
        }

        let fine = compute_fine(due_date, today, fine_per_day);

        let record = sqlx::query_as::<_, BookReturn>(
            r#"
            INSERT INTO book_returns (issue_id, return_date, condition, fine, received_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(data.issue_id)
        .bind(today)
        .bind(&data.condition)
        .bind(fine)
        .bind(received_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(already_returned_on_unique)?;

        sqlx::query("UPDATE inventories SET status = 'available' WHERE id = $1")
            .bind(inventory_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            return_id = record.id,
            issue_id = data.issue_id,
            inventory_id,
            fine = %record.fine,
            "Book returned"
        );
        Ok(record)
    }

    /// Amend the condition notes
    pub async fn update_condition(&self, id: i32, condition: &str) -> AppResult<BookReturn> {
        sqlx::query_as::<_, BookReturn>(
            r#"
            UPDATE book_returns SET condition = $2
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(condition)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Return with id {} not found", id)))
    }

    /// Soft delete; the issue stays closed
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE book_returns SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Return with id {} not found", id)));
        }
        Ok(())
    }
}

/// A second return racing past the existence check hits the unique index on `issue_id`
fn already_returned_on_unique(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RuleViolation::AlreadyReturned.into()
        }
        _ => AppError::Database(err),
    }
}
