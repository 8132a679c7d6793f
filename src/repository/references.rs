//! Repository shared by the named reference tables (directions, publishers)

use std::marker::PhantomData;

use sqlx::{postgres::PgRow, FromRow, Pool, Postgres, QueryBuilder};

use super::{like_pattern, order_clause, Page};
use crate::{
    error::{AppError, AppResult},
    models::reference::{NameQuery, NamedRecord},
};

const NAME_ORDERING: &[(&str, &str)] = &[("name", "name")];

pub struct ReferenceRepository<T> {
    pool: Pool<Postgres>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for ReferenceRepository<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> ReferenceRepository<T>
where
    T: NamedRecord + for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            _record: PhantomData,
        }
    }

    fn not_found(id: i32) -> AppError {
        AppError::NotFound(format!("{} with id {} not found", T::LABEL, id))
    }

    /// Get a non-deleted record by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<T> {
        let sql = format!("SELECT * FROM {} WHERE id = $1 AND deleted_at IS NULL", T::TABLE);
        sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Self::not_found(id))
    }

    /// Get a record by ID, tombstoned or not (for display on books)
    pub async fn find_any(&self, id: i32) -> AppResult<Option<T>> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", T::TABLE);
        let record = sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    fn filtered(select: String, query: &NameQuery) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(select);
        qb.push(" WHERE deleted_at IS NULL");

        if let Some(ref search) = query.search {
            qb.push(" AND name ILIKE ").push_bind(like_pattern(search));
        }

        qb
    }

    /// Search with pagination
    pub async fn search(&self, query: &NameQuery) -> AppResult<(Vec<T>, i64)> {
        let page = Page::new(query.page, query.per_page);

        let total = Self::filtered(format!("SELECT COUNT(*) FROM {}", T::TABLE), query)
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = Self::filtered(format!("SELECT * FROM {}", T::TABLE), query);
        qb.push(" ORDER BY ")
            .push(order_clause(query.ordering.as_deref(), NAME_ORDERING, "name ASC"))
            .push(", id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let records = qb.build_query_as::<T>().fetch_all(&self.pool).await?;

        Ok((records, total))
    }

    pub async fn create(&self, name: &str) -> AppResult<T> {
        let sql = format!("INSERT INTO {} (name) VALUES ($1) RETURNING *", T::TABLE);
        let record = sqlx::query_as::<_, T>(&sql)
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(record)
    }

    pub async fn update(&self, id: i32, name: &str) -> AppResult<T> {
        let sql = format!(
            "UPDATE {} SET name = $2 WHERE id = $1 AND deleted_at IS NULL RETURNING *",
            T::TABLE
        );
        sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Self::not_found(id))
    }

    /// Soft delete
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let sql = format!(
            "UPDATE {} SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
            T::TABLE
        );
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }
}
