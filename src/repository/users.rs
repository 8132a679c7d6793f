//! Users repository for database operations

use sqlx::{Pool, Postgres, QueryBuilder};

use super::{like_pattern, order_clause, Page};
use crate::{
    error::{conflict_on_unique, AppError, AppResult},
    models::user::{CreateUser, UpdateUser, User, UserQuery},
};

const USER_ORDERING: &[(&str, &str)] = &[("last_name", "last_name"), ("username", "username")];

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get active user by username (authentication)
    pub async fn get_active_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(username) = LOWER($1) AND is_active",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Check whether another user already uses `value` in a unique column
    pub async fn value_taken(
        &self,
        column: UniqueColumn,
        value: &str,
        exclude_id: Option<i32>,
    ) -> AppResult<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM users WHERE {} AND ($2::int IS NULL OR id <> $2))",
            column.predicate()
        );
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(value)
            .bind(exclude_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    fn filtered(select: &str, query: &UserQuery) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(select);
        qb.push(" WHERE TRUE");

        if let Some(ref search) = query.search {
            let pattern = like_pattern(search);
            qb.push(" AND (first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR last_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR passport ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR phone ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR username ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        if let Some(role) = query.role {
            qb.push(" AND role = ").push_bind(role);
        }

        qb
    }

    /// Search users with pagination
    pub async fn search(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        let page = Page::new(query.page, query.per_page);

        let total: i64 = Self::filtered("SELECT COUNT(*) FROM users", query)
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = Self::filtered("SELECT * FROM users", query);
        qb.push(" ORDER BY ")
            .push(order_clause(query.ordering.as_deref(), USER_ORDERING, "id ASC"))
            .push(", id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let users = qb.build_query_as::<User>().fetch_all(&self.pool).await?;

        Ok((users, total))
    }

    /// Create a new user with an already hashed password
    pub async fn create(&self, user: &CreateUser, password_hash: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                username, password, first_name, last_name, middle_name, email,
                birth_date, passport, phone, address, role
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&user.username)
        .bind(password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.middle_name)
        .bind(user.email.clone().unwrap_or_default())
        .bind(user.birth_date)
        .bind(&user.passport)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(user.role.unwrap_or_default())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "A user with this username, passport or phone already exists"))
    }

    /// Update a user; absent fields keep their value
    pub async fn update(
        &self,
        id: i32,
        user: &UpdateUser,
        password_hash: Option<&str>,
    ) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                username    = COALESCE($2, username),
                password    = COALESCE($3, password),
                first_name  = COALESCE($4, first_name),
                last_name   = COALESCE($5, last_name),
                middle_name = COALESCE($6, middle_name),
                email       = COALESCE($7, email),
                birth_date  = COALESCE($8, birth_date),
                passport    = COALESCE($9, passport),
                phone       = COALESCE($10, phone),
                address     = COALESCE($11, address),
                role        = COALESCE($12, role),
                is_active   = COALESCE($13, is_active)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&user.username)
        .bind(password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.middle_name)
        .bind(&user.email)
        .bind(user.birth_date)
        .bind(&user.passport)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(user.role)
        .bind(user.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "A user with this username, passport or phone already exists"))?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Deactivate a user; accounts are never removed
    pub async fn deactivate(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }
}

/// User columns carrying a uniqueness rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueColumn {
    Username,
    Passport,
    Phone,
}

impl UniqueColumn {
    fn predicate(&self) -> &'static str {
        match self {
            UniqueColumn::Username => "LOWER(username) = LOWER($1)",
            UniqueColumn::Passport => "passport = $1",
            UniqueColumn::Phone => "phone = $1",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UniqueColumn::Username => "username",
            UniqueColumn::Passport => "passport",
            UniqueColumn::Phone => "phone",
        }
    }
}
