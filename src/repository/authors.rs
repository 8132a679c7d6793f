//! Authors repository for database operations

use sqlx::{Pool, Postgres, QueryBuilder};

use super::{like_pattern, order_clause, Page};
use crate::{
    error::{AppError, AppResult},
    models::author::{Author, AuthorQuery, CreateAuthor, UpdateAuthor},
};

const AUTHOR_ORDERING: &[(&str, &str)] = &[("last_name", "last_name"), ("first_name", "first_name")];

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a non-deleted author by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Author> {
        sqlx::query_as::<_, Author>("SELECT * FROM authors WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    /// Authors linked to the given books, keyed by book id
    pub async fn for_books(&self, book_ids: &[i32]) -> AppResult<Vec<(i32, Author)>> {
        let rows = sqlx::query_as::<_, BookAuthorRow>(
            r#"
            SELECT ba.book_id, a.id, a.first_name, a.last_name, a.middle_name, a.deleted_at
            FROM book_authors ba
            JOIN authors a ON a.id = ba.author_id
            WHERE ba.book_id = ANY($1)
            ORDER BY a.last_name, a.first_name
            "#,
        )
        .bind(book_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.book_id,
                    Author {
                        id: row.id,
                        first_name: row.first_name,
                        last_name: row.last_name,
                        middle_name: row.middle_name,
                        deleted_at: row.deleted_at,
                    },
                )
            })
            .collect())
    }

    fn filtered(select: &str, query: &AuthorQuery) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(select);
        qb.push(" WHERE deleted_at IS NULL");

        if let Some(ref search) = query.search {
            let pattern = like_pattern(search);
            qb.push(" AND (first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR last_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        qb
    }

    /// Search authors with pagination
    pub async fn search(&self, query: &AuthorQuery) -> AppResult<(Vec<Author>, i64)> {
        let page = Page::new(query.page, query.per_page);

        let total = Self::filtered("SELECT COUNT(*) FROM authors", query)
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = Self::filtered("SELECT * FROM authors", query);
        qb.push(" ORDER BY ")
            .push(order_clause(query.ordering.as_deref(), AUTHOR_ORDERING, "last_name ASC"))
            .push(", id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let authors = qb.build_query_as::<Author>().fetch_all(&self.pool).await?;

        Ok((authors, total))
    }

    /// Create author
    pub async fn create(&self, data: &CreateAuthor) -> AppResult<Author> {
        let author = sqlx::query_as::<_, Author>(
            r#"
            INSERT INTO authors (first_name, last_name, middle_name)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.middle_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(author)
    }

    /// Update author
    pub async fn update(&self, id: i32, data: &UpdateAuthor) -> AppResult<Author> {
        sqlx::query_as::<_, Author>(
            r#"
            UPDATE authors SET
                first_name  = COALESCE($2, first_name),
                last_name   = COALESCE($3, last_name),
                middle_name = COALESCE($4, middle_name)
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.middle_name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    /// Soft delete author
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE authors SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Author with id {} not found", id)));
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct BookAuthorRow {
    book_id: i32,
    id: i32,
    first_name: String,
    last_name: String,
    middle_name: String,
    deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}
