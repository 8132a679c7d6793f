//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{
    auth, authors, books, directions, health, inventories, issues, publishers, reports, returns,
    users,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library API",
        version = "1.0.0",
        description = "Library management REST API: catalog, copies, issues, returns and reports",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api", description = "API")
    ),
    modifiers(&SecurityAddon),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::obtain_token,
        auth::refresh_token,
        auth::verify_token,
        auth::register,
        auth::me,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        // Authors
        authors::list_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        // Directions
        directions::list_directions,
        directions::get_direction,
        directions::create_direction,
        directions::update_direction,
        directions::delete_direction,
        // Publishers
        publishers::list_publishers,
        publishers::get_publisher,
        publishers::create_publisher,
        publishers::update_publisher,
        publishers::delete_publisher,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Inventories
        inventories::list_inventories,
        inventories::get_inventory,
        inventories::create_inventory,
        inventories::delete_inventory,
        // Issues
        issues::list_issues,
        issues::get_issue,
        issues::create_issue,
        issues::update_issue,
        issues::delete_issue,
        // Returns
        returns::list_returns,
        returns::get_return,
        returns::create_return,
        returns::update_return,
        returns::delete_return,
        // Reports
        reports::issued,
        reports::overdue,
        reports::availability,
        reports::readers,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::RefreshRequest,
            auth::AccessResponse,
            auth::VerifyRequest,
            auth::VerifyResponse,
            auth::RegisterResponse,
            crate::models::user::TokenPair,
            crate::models::user::RegisterUser,
            // Users
            crate::models::user::User,
            crate::models::user::UserShort,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            crate::models::enums::Role,
            // Catalog
            crate::models::author::Author,
            crate::models::author::CreateAuthor,
            crate::models::author::UpdateAuthor,
            crate::models::reference::Direction,
            crate::models::reference::Publisher,
            crate::models::reference::NameRequest,
            crate::models::book::Book,
            crate::models::book::BookDetails,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::enums::BookCategory,
            crate::models::inventory::Inventory,
            crate::models::inventory::CreateInventory,
            crate::models::enums::InventoryStatus,
            // Lending
            crate::models::issue::IssueDetails,
            crate::models::issue::CreateIssue,
            crate::models::issue::UpdateIssue,
            crate::models::issue::LoanStatus,
            crate::models::book_return::BookReturn,
            crate::models::book_return::ReturnDetails,
            crate::models::book_return::CreateReturn,
            crate::models::book_return::UpdateReturn,
            // Reports
            crate::models::report::OverdueEntry,
            crate::models::report::AvailabilityEntry,
            crate::models::report::ReaderActivity,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Tokens and self-registration"),
        (name = "users", description = "User management"),
        (name = "authors", description = "Authors"),
        (name = "directions", description = "Subject areas"),
        (name = "publishers", description = "Publishers"),
        (name = "books", description = "Book catalog"),
        (name = "inventories", description = "Physical copies"),
        (name = "issues", description = "Issuing books to readers"),
        (name = "returns", description = "Returns and fines"),
        (name = "reports", description = "Librarian reports")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
