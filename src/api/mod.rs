//! API handlers for the library REST endpoints

pub mod auth;
pub mod authors;
pub mod books;
pub mod directions;
pub mod health;
pub mod inventories;
pub mod issues;
pub mod openapi;
pub mod publishers;
pub mod reports;
pub mod returns;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{error::AppError, models::user::UserClaims, repository::Page, AppState};

/// Extractor for authenticated user from JWT access token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Get the Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = state.services.auth.authenticate(token).await?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// List of items
    pub items: Vec<T>,
    /// Total number of items
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Items per page
    pub per_page: i64,
}

impl<T> PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(items: Vec<T>, total: i64, page: Option<i64>, per_page: Option<i64>) -> Self {
        let page = Page::new(page, per_page);
        Self {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        }
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/token", post(auth::obtain_token))
        .route("/token/refresh", post(auth::refresh_token))
        .route("/token/verify", post(auth::verify_token))
        .route("/register", post(auth::register))
        .route("/users/me", get(auth::me))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // Authors
        .route("/authors", get(authors::list_authors).post(authors::create_author))
        .route(
            "/authors/:id",
            get(authors::get_author)
                .put(authors::update_author)
                .delete(authors::delete_author),
        )
        // Directions
        .route(
            "/directions",
            get(directions::list_directions).post(directions::create_direction),
        )
        .route(
            "/directions/:id",
            get(directions::get_direction)
                .put(directions::update_direction)
                .delete(directions::delete_direction),
        )
        // Publishers
        .route(
            "/publishers",
            get(publishers::list_publishers).post(publishers::create_publisher),
        )
        .route(
            "/publishers/:id",
            get(publishers::get_publisher)
                .put(publishers::update_publisher)
                .delete(publishers::delete_publisher),
        )
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // Inventories
        .route(
            "/inventories",
            get(inventories::list_inventories).post(inventories::create_inventory),
        )
        .route(
            "/inventories/:id",
            get(inventories::get_inventory).delete(inventories::delete_inventory),
        )
        // Issues
        .route("/issues", get(issues::list_issues).post(issues::create_issue))
        .route(
            "/issues/:id",
            get(issues::get_issue)
                .put(issues::update_issue)
                .delete(issues::delete_issue),
        )
        // Returns
        .route("/returns", get(returns::list_returns).post(returns::create_return))
        .route(
            "/returns/:id",
            get(returns::get_return)
                .put(returns::update_return)
                .delete(returns::delete_return),
        )
        // Reports
        .route("/reports/issued", get(reports::issued))
        .route("/reports/overdue", get(reports::overdue))
        .route("/reports/availability", get(reports::availability))
        .route("/reports/readers", get(reports::readers))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
