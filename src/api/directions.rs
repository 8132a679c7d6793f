//! Direction (subject area) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::reference::{Direction, NameQuery, NameRequest},
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List directions
#[utoipa::path(
    get,
    path = "/directions",
    tag = "directions",
    security(("bearer_auth" = [])),
    params(NameQuery),
    responses(
        (status = 200, description = "List of directions", body = PaginatedResponse<Direction>)
    )
)]
pub async fn list_directions(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<NameQuery>,
) -> AppResult<Json<PaginatedResponse<Direction>>> {
    let (directions, total) = state.services.catalog.search_directions(&query).await?;

    Ok(Json(PaginatedResponse::new(directions, total, query.page, query.per_page)))
}

/// Get direction by ID
#[utoipa::path(
    get,
    path = "/directions/{id}",
    tag = "directions",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Direction ID")),
    responses(
        (status = 200, description = "Direction", body = Direction),
        (status = 404, description = "Direction not found")
    )
)]
pub async fn get_direction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Direction>> {
    Ok(Json(state.services.catalog.get_direction(id).await?))
}

/// Create direction
#[utoipa::path(
    post,
    path = "/directions",
    tag = "directions",
    security(("bearer_auth" = [])),
    request_body = NameRequest,
    responses(
        (status = 201, description = "Direction created", body = Direction),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_direction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<NameRequest>,
) -> AppResult<(StatusCode, Json<Direction>)> {
    claims.require_librarian()?;

    let created = state.services.catalog.create_direction(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Rename direction
#[utoipa::path(
    put,
    path = "/directions/{id}",
    tag = "directions",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Direction ID")),
    request_body = NameRequest,
    responses(
        (status = 200, description = "Direction updated", body = Direction),
        (status = 404, description = "Direction not found")
    )
)]
pub async fn update_direction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<NameRequest>,
) -> AppResult<Json<Direction>> {
    claims.require_librarian()?;

    Ok(Json(state.services.catalog.update_direction(id, request).await?))
}

/// Delete direction
#[utoipa::path(
    delete,
    path = "/directions/{id}",
    tag = "directions",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Direction ID")),
    responses(
        (status = 204, description = "Direction deleted"),
        (status = 404, description = "Direction not found")
    )
)]
pub async fn delete_direction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_librarian()?;

    state.services.catalog.delete_direction(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
