//! Report endpoints (librarians only)

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::{
        issue::IssueDetails,
        report::{AvailabilityEntry, OverdueEntry, ReaderActivity},
    },
};

use super::AuthenticatedUser;

/// Books currently out
#[utoipa::path(
    get,
    path = "/reports/issued",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Open issues", body = Vec<IssueDetails>),
        (status = 403, description = "Librarian role required")
    )
)]
pub async fn issued(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<IssueDetails>>> {
    claims.require_librarian()?;

    Ok(Json(state.services.reports.issued().await?))
}

/// Books past their due date
#[utoipa::path(
    get,
    path = "/reports/overdue",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue issues with accrued fines", body = Vec<OverdueEntry>),
        (status = 403, description = "Librarian role required")
    )
)]
pub async fn overdue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<OverdueEntry>>> {
    claims.require_librarian()?;

    Ok(Json(state.services.reports.overdue().await?))
}

/// Available and borrowed copies per book
#[utoipa::path(
    get,
    path = "/reports/availability",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Copy counts", body = Vec<AvailabilityEntry>),
        (status = 403, description = "Librarian role required")
    )
)]
pub async fn availability(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<AvailabilityEntry>>> {
    claims.require_librarian()?;

    Ok(Json(state.services.reports.availability().await?))
}

/// Borrowing activity and fines per reader
#[utoipa::path(
    get,
    path = "/reports/readers",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reader activity", body = Vec<ReaderActivity>),
        (status = 403, description = "Librarian role required")
    )
)]
pub async fn readers(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ReaderActivity>>> {
    claims.require_librarian()?;

    Ok(Json(state.services.reports.readers().await?))
}
