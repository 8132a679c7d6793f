//! Return endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::book_return::{CreateReturn, ReturnDetails, ReturnQuery, UpdateReturn},
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List returns; a reader only sees their own
#[utoipa::path(
    get,
    path = "/returns",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(ReturnQuery),
    responses(
        (status = 200, description = "List of returns", body = PaginatedResponse<ReturnDetails>)
    )
)]
pub async fn list_returns(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReturnQuery>,
) -> AppResult<Json<PaginatedResponse<ReturnDetails>>> {
    let (returns, total) = state.services.lending.search_returns(&claims, &query).await?;

    Ok(Json(PaginatedResponse::new(returns, total, query.page, query.per_page)))
}

#[utoipa::path(
    get,
    path = "/returns/{id}",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Return ID")),
    responses(
        (status = 200, description = "Return", body = ReturnDetails),
        (status = 403, description = "Return of another reader"),
        (status = 404, description = "Return not found")
    )
)]
pub async fn get_return(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReturnDetails>> {
    Ok(Json(state.services.lending.get_return(&claims, id).await?))
}

/// Register a return; late returns are fined per day of delay
#[utoipa::path(
    post,
    path = "/returns",
    tag = "returns",
    security(("bearer_auth" = [])),
    request_body = CreateReturn,
    responses(
        (status = 201, description = "Return registered", body = ReturnDetails),
        (status = 404, description = "Issue not found"),
        (status = 422, description = "Already returned", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_return(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateReturn>,
) -> AppResult<(StatusCode, Json<ReturnDetails>)> {
    claims.require_librarian()?;

    let created = state.services.lending.create_return(&claims, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Amend the condition notes of a return
#[utoipa::path(
    put,
    path = "/returns/{id}",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Return ID")),
    request_body = UpdateReturn,
    responses(
        (status = 200, description = "Return updated", body = ReturnDetails),
        (status = 404, description = "Return not found")
    )
)]
pub async fn update_return(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateReturn>,
) -> AppResult<Json<ReturnDetails>> {
    claims.require_librarian()?;

    Ok(Json(state.services.lending.update_return(id, request).await?))
}

/// Delete a return record; the issue stays closed
#[utoipa::path(
    delete,
    path = "/returns/{id}",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Return ID")),
    responses(
        (status = 204, description = "Return deleted"),
        (status = 404, description = "Return not found")
    )
)]
pub async fn delete_return(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_librarian()?;

    state.services.lending.delete_return(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
