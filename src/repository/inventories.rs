//! Inventories repository (physical copies)

use sqlx::{Pool, Postgres, QueryBuilder};

use super::{
    books::{add_copies, lock_book},
    like_pattern, order_clause, Page,
};
use crate::{
    error::{AppError, AppResult, RuleViolation},
    models::{
        book::MAX_QUANTITY,
        enums::InventoryStatus,
        inventory::{Inventory, InventoryQuery},
    },
};

const INVENTORY_SELECT: &str = r#"
    SELECT i.id, i.book_id, b.title AS book_title, i.inventory_number, i.status
    FROM inventories i
    JOIN books b ON b.id = i.book_id
"#;

const INVENTORY_ORDERING: &[(&str, &str)] = &[("inventory_number", "i.inventory_number")];

#[derive(Clone)]
pub struct InventoriesRepository {
    pool: Pool<Postgres>,
}

impl InventoriesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a copy by ID, whatever its status
    pub async fn get_by_id(&self, id: i32) -> AppResult<Inventory> {
        sqlx::query_as::<_, Inventory>(&format!("{} WHERE i.id = $1", INVENTORY_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Inventory with id {} not found", id)))
    }

    fn filtered(select: &str, query: &InventoryQuery) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(select);

        match query.status {
            Some(status) => {
                qb.push(" WHERE i.status = ").push_bind(status);
            }
            None => {
                qb.push(" WHERE i.status <> 'deleted'");
            }
        }

        if let Some(book_id) = query.book_id {
            qb.push(" AND i.book_id = ").push_bind(book_id);
        }

        if let Some(ref search) = query.search {
            let pattern = like_pattern(search);
            qb.push(" AND (i.inventory_number ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR b.title ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        qb
    }

    /// Search copies with pagination; deleted copies only when asked for
    pub async fn search(&self, query: &InventoryQuery) -> AppResult<(Vec<Inventory>, i64)> {
        let page = Page::new(query.page, query.per_page);

        let total = Self::filtered(
            "SELECT COUNT(*) FROM inventories i JOIN books b ON b.id = i.book_id",
            query,
        )
        .build_query_scalar::<i64>()
        .fetch_one(&self.pool)
        .await?;

        let mut qb = Self::filtered(INVENTORY_SELECT, query);
        qb.push(" ORDER BY ")
            .push(order_clause(query.ordering.as_deref(), INVENTORY_ORDERING, "i.id ASC"))
            .push(", i.id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let copies = qb.build_query_as::<Inventory>().fetch_all(&self.pool).await?;

        Ok((copies, total))
    }

    /// Add one available copy and raise the book quantity accordingly
    pub async fn add_copy(&self, book_id: i32) -> AppResult<Inventory> {
        let mut tx = self.pool.begin().await?;

        let book = lock_book(&mut tx, book_id).await?;
        if book.quantity >= MAX_QUANTITY {
            return Err(AppError::Validation(format!(
                "quantity: A book cannot have more than {} copies",
                MAX_QUANTITY
            )));
        }
        let ids = add_copies(&mut tx, book_id, 1).await?;

        sqlx::query("UPDATE books SET quantity = quantity + 1 WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let id = ids
            .first()
            .copied()
            .ok_or_else(|| AppError::Internal("Copy was not created".to_string()))?;
        tracing::info!(book_id, inventory_id = id, "Copy added");
        self.get_by_id(id).await
    }

    /// Remove one never-issued available copy and lower the book quantity accordingly
    pub async fn remove_copy(&self, id: i32) -> AppResult<()> {
        let copy = self.get_by_id(id).await?;
        if copy.status == InventoryStatus::Deleted {
            return Err(AppError::NotFound(format!("Inventory with id {} not found", id)));
        }

        let mut tx = self.pool.begin().await?;

        lock_book(&mut tx, copy.book_id).await?;

        let ever_issued: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM book_issues WHERE inventory_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if ever_issued {
            return Err(RuleViolation::CopyWasIssued.into());
        }

        let retired = sqlx::query(
            "UPDATE inventories SET status = 'deleted' WHERE id = $1 AND status = 'available'",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if retired.rows_affected() == 0 {
            return Err(RuleViolation::CopyNotAvailable.into());
        }

        sqlx::query("UPDATE books SET quantity = quantity - 1 WHERE id = $1")
            .bind(copy.book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(book_id = copy.book_id, inventory_id = id, "Copy removed");
        Ok(())
    }
}
