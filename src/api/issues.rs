//! Issue (loan) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::issue::{CreateIssue, IssueDetails, IssueQuery, UpdateIssue},
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List issues; a reader only sees their own
#[utoipa::path(
    get,
    path = "/issues",
    tag = "issues",
    security(("bearer_auth" = [])),
    params(IssueQuery),
    responses(
        (status = 200, description = "List of issues", body = PaginatedResponse<IssueDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_issues(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<IssueQuery>,
) -> AppResult<Json<PaginatedResponse<IssueDetails>>> {
    let (page, per_page) = (query.page, query.per_page);
    let (issues, total) = state.services.lending.search_issues(&claims, query).await?;

    Ok(Json(PaginatedResponse::new(issues, total, page, per_page)))
}

/// Get issue by ID
#[utoipa::path(
    get,
    path = "/issues/{id}",
    tag = "issues",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Issue ID")),
    responses(
        (status = 200, description = "Issue", body = IssueDetails),
        (status = 403, description = "Issue of another reader"),
        (status = 404, description = "Issue not found")
    )
)]
pub async fn get_issue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<IssueDetails>> {
    let issue = state.services.lending.get_issue(&claims, id).await?;
    Ok(Json(issue))
}

/// Issue a copy of a book to a reader
///
/// Refused when no copy is available, when the reader already holds the
/// maximum number of books, or when they already hold a copy of this book.
#[utoipa::path(
    post,
    path = "/issues",
    tag = "issues",
    security(("bearer_auth" = [])),
    request_body = CreateIssue,
    responses(
        (status = 201, description = "Book issued", body = IssueDetails),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Reader or book not found"),
        (status = 422, description = "Issue refused", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_issue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateIssue>,
) -> AppResult<(StatusCode, Json<IssueDetails>)> {
    claims.require_librarian()?;

    let issue = state.services.lending.create_issue(&claims, request).await?;
    Ok((StatusCode::CREATED, Json(issue)))
}

/// Change the due date of an issue
#[utoipa::path(
    put,
    path = "/issues/{id}",
    tag = "issues",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Issue ID")),
    request_body = UpdateIssue,
    responses(
        (status = 200, description = "Issue updated", body = IssueDetails),
        (status = 404, description = "Issue not found")
    )
)]
pub async fn update_issue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateIssue>,
) -> AppResult<Json<IssueDetails>> {
    claims.require_librarian()?;

    Ok(Json(state.services.lending.update_issue(id, request).await?))
}

/// Delete a returned issue
#[utoipa::path(
    delete,
    path = "/issues/{id}",
    tag = "issues",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Issue ID")),
    responses(
        (status = 204, description = "Issue deleted"),
        (status = 404, description = "Issue not found"),
        (status = 422, description = "Book not returned yet", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_issue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_librarian()?;

    state.services.lending.delete_issue(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
