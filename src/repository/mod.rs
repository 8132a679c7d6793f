//! Repository layer for database operations

pub mod authors;
pub mod books;
pub mod inventories;
pub mod issues;
pub mod references;
pub mod reports;
pub mod returns;
pub mod users;

use sqlx::{Pool, Postgres};

use crate::models::reference::{Direction, Publisher};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub authors: authors::AuthorsRepository,
    pub directions: references::ReferenceRepository<Direction>,
    pub publishers: references::ReferenceRepository<Publisher>,
    pub books: books::BooksRepository,
    pub inventories: inventories::InventoriesRepository,
    pub issues: issues::IssuesRepository,
    pub returns: returns::ReturnsRepository,
    pub reports: reports::ReportsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            authors: authors::AuthorsRepository::new(pool.clone()),
            directions: references::ReferenceRepository::new(pool.clone()),
            publishers: references::ReferenceRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            inventories: inventories::InventoriesRepository::new(pool.clone()),
            issues: issues::IssuesRepository::new(pool.clone()),
            returns: returns::ReturnsRepository::new(pool.clone()),
            reports: reports::ReportsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the database, used by the readiness probe
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Page window derived from `page` / `per_page` query parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub per_page: i64,
}

impl Page {
    pub const DEFAULT_PER_PAGE: i64 = 20;
    pub const MAX_PER_PAGE: i64 = 100;

    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(Self::DEFAULT_PER_PAGE)
                .clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

/// Translate an `ordering` parameter (`field` or `-field`) into an ORDER BY expression.
///
/// Only fields listed in `allowed` as `(parameter, column)` pairs are accepted;
/// anything else falls back to `default`.
pub fn order_clause(ordering: Option<&str>, allowed: &[(&str, &str)], default: &str) -> String {
    let Some(raw) = ordering.map(str::trim).filter(|s| !s.is_empty()) else {
        return default.to_string();
    };
    let (field, direction) = match raw.strip_prefix('-') {
        Some(field) => (field, "DESC"),
        None => (raw, "ASC"),
    };
    allowed
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, column)| format!("{} {}", column, direction))
        .unwrap_or_else(|| default.to_string())
}

/// `%term%` pattern for ILIKE searches
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOK_FIELDS: &[(&str, &str)] = &[("title", "b.title"), ("quantity", "b.quantity")];

    #[test]
    fn test_page_defaults_and_clamping() {
        assert_eq!(Page::new(None, None), Page { page: 1, per_page: 20 });
        assert_eq!(Page::new(Some(0), Some(1000)), Page { page: 1, per_page: 100 });
        let page = Page::new(Some(3), Some(10));
        assert_eq!(page.limit(), 10);
        assert_eq!(page.offset(), 20);
    }

    #[test]
    fn test_order_clause() {
        assert_eq!(order_clause(Some("title"), BOOK_FIELDS, "b.id ASC"), "b.title ASC");
        assert_eq!(order_clause(Some("-quantity"), BOOK_FIELDS, "b.id ASC"), "b.quantity DESC");
        assert_eq!(order_clause(Some("isbn; DROP TABLE books"), BOOK_FIELDS, "b.id ASC"), "b.id ASC");
        assert_eq!(order_clause(None, BOOK_FIELDS, "b.id ASC"), "b.id ASC");
        assert_eq!(order_clause(Some(" "), BOOK_FIELDS, "b.id ASC"), "b.id ASC");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" tolkien "), "%tolkien%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
