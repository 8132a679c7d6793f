//! Books repository: catalog records and copy-count reconciliation.
//!
//! Every change to a book's `quantity` runs in one transaction together with
//! the matching change to its inventory rows, so that the number of
//! non-deleted copies always equals the declared quantity.

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use super::{like_pattern, order_clause, Page};
use crate::{
    error::{AppError, AppResult, RuleViolation},
    models::{
        book::{ensure_can_shrink, Book, BookQuery, CreateBook, QuantityChange, UpdateBook},
        inventory::format_inventory_number,
    },
};

const BOOK_ORDERING: &[(&str, &str)] = &[("title", "b.title"), ("quantity", "b.quantity")];

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a non-deleted book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    fn filtered(select: &str, query: &BookQuery) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(select);
        qb.push(" WHERE b.deleted_at IS NULL");

        if let Some(ref search) = query.search {
            let pattern = like_pattern(search);
            qb.push(" AND (b.title ILIKE ")
                .push_bind(pattern.clone())
                .push(
                    " OR EXISTS (SELECT 1 FROM book_authors ba JOIN authors a ON a.id = ba.author_id \
                     WHERE ba.book_id = b.id AND a.last_name ILIKE ",
                )
                .push_bind(pattern)
                .push("))");
        }

        if let Some(publisher_id) = query.publisher_id {
            qb.push(" AND b.publisher_id = ").push_bind(publisher_id);
        }

        if let Some(direction_id) = query.direction_id {
            qb.push(" AND b.direction_id = ").push_bind(direction_id);
        }

        qb
    }

    /// Search books with pagination
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let page = Page::new(query.page, query.per_page);

        let total = Self::filtered("SELECT COUNT(*) FROM books b", query)
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = Self::filtered("SELECT b.* FROM books b", query);
        qb.push(" ORDER BY ")
            .push(order_clause(query.ordering.as_deref(), BOOK_ORDERING, "b.title ASC"))
            .push(", b.id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let books = qb.build_query_as::<Book>().fetch_all(&self.pool).await?;

        Ok((books, total))
    }

    /// Create a book together with `quantity` available copies
    pub async fn create(&self, data: &CreateBook, author_ids: &[i32]) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (
                title, direction_id, publisher_id, udc, bbk, isbn,
                quantity, category, description
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(data.direction_id)
        .bind(data.publisher_id)
        .bind(&data.udc)
        .bind(&data.bbk)
        .bind(&data.isbn)
        .bind(data.quantity)
        .bind(data.category)
        .bind(&data.description)
        .fetch_one(&mut *tx)
        .await?;

        set_authors(&mut tx, book.id, author_ids).await?;
        add_copies(&mut tx, book.id, book.quantity as i64).await?;

        tx.commit().await?;

        tracing::info!(book_id = book.id, quantity = book.quantity, "Book created");
        Ok(book)
    }

    /// Update a book, reconciling its copies when the quantity changes
    pub async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        // The row lock also serializes against concurrent issuance of this book
        let current = lock_book(&mut tx, id).await?;

        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title        = COALESCE($2, title),
                direction_id = COALESCE($3, direction_id),
                publisher_id = COALESCE($4, publisher_id),
                udc          = COALESCE($5, udc),
                bbk          = COALESCE($6, bbk),
                isbn         = COALESCE($7, isbn),
                quantity     = COALESCE($8, quantity),
                category     = COALESCE($9, category),
                description  = COALESCE($10, description)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(data.direction_id)
        .bind(data.publisher_id)
        .bind(&data.udc)
        .bind(&data.bbk)
        .bind(&data.isbn)
        .bind(data.quantity)
        .bind(data.category)
        .bind(&data.description)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(ref author_ids) = data.author_ids {
            sqlx::query("DELETE FROM book_authors WHERE book_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            set_authors(&mut tx, id, author_ids).await?;
        }

        match QuantityChange::between(current.quantity, book.quantity) {
            QuantityChange::Unchanged => {}
            QuantityChange::Grow(count) => {
                add_copies(&mut tx, id, count).await?;
            }
            QuantityChange::Shrink(count) => retire_copies(&mut tx, id, count).await?,
        }

        tx.commit().await?;

        if current.quantity != book.quantity {
            tracing::info!(
                book_id = id,
                from = current.quantity,
                to = book.quantity,
                "Book quantity reconciled"
            );
        }
        Ok(book)
    }

    /// Soft delete a book and retire all its copies; books with loan history are kept
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        lock_book(&mut tx, id).await?;

        let ever_issued: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM book_issues bi
                JOIN inventories i ON i.id = bi.inventory_id
                WHERE i.book_id = $1
            )
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if ever_issued {
            return Err(RuleViolation::BookWasIssued.into());
        }

        sqlx::query("UPDATE inventories SET status = 'deleted' WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE books SET deleted_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }
}

/// Lock a non-deleted book row for the rest of the transaction
pub(crate) async fn lock_book(conn: &mut PgConnection, id: i32) -> AppResult<Book> {
    sqlx::query_as::<_, Book>(
        "SELECT * FROM books WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
}

async fn set_authors(conn: &mut PgConnection, book_id: i32, author_ids: &[i32]) -> AppResult<()> {
    if author_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "INSERT INTO book_authors (book_id, author_id) SELECT $1, UNNEST($2::int[]) ON CONFLICT DO NOTHING",
    )
    .bind(book_id)
    .bind(author_ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Append `count` available copies, each numbered from its own row id
pub(crate) async fn add_copies(conn: &mut PgConnection, book_id: i32, count: i64) -> AppResult<Vec<i32>> {
    if count <= 0 {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = sqlx::query_scalar(
        r#"
        INSERT INTO inventories (book_id, status)
        SELECT $1, 'available' FROM generate_series(1, $2::bigint)
        RETURNING id
        "#,
    )
    .bind(book_id)
    .bind(count)
    .fetch_all(&mut *conn)
    .await?;

    let numbers: Vec<String> = ids.iter().map(|&id| format_inventory_number(id)).collect();
    sqlx::query(
        r#"
        UPDATE inventories i SET inventory_number = n.number
        FROM UNNEST($1::int[], $2::text[]) AS n(id, number)
        WHERE i.id = n.id
        "#,
    )
    .bind(&ids)
    .bind(&numbers)
    .execute(&mut *conn)
    .await?;

    Ok(ids)
}

/// Mark the `count` oldest available copies as deleted, or fail if there are not enough
async fn retire_copies(conn: &mut PgConnection, book_id: i32, count: i64) -> AppResult<()> {
    let available: Vec<i32> = sqlx::query_scalar(
        r#"
        SELECT id FROM inventories
        WHERE book_id = $1 AND status = 'available'
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(book_id)
    .fetch_all(&mut *conn)
    .await?;

    ensure_can_shrink(count, available.len() as i64)?;

    let retired: Vec<i32> = available.into_iter().take(count as usize).collect();
    sqlx::query("UPDATE inventories SET status = 'deleted' WHERE id = ANY($1)")
        .bind(&retired)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
