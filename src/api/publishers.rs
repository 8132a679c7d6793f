//! Publisher endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::reference::{Publisher, NameQuery, NameRequest},
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List publishers
#[utoipa::path(
    get,
    path = "/publishers",
    tag = "publishers",
    security(("bearer_auth" = [])),
    params(NameQuery),
    responses(
        (status = 200, description = "List of publishers", body = PaginatedResponse<Publisher>)
    )
)]
pub async fn list_publishers(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<NameQuery>,
) -> AppResult<Json<PaginatedResponse<Publisher>>> {
    let (publishers, total) = state.services.catalog.search_publishers(&query).await?;

    Ok(Json(PaginatedResponse::new(publishers, total, query.page, query.per_page)))
}

/// Get publisher by ID
#[utoipa::path(
    get,
    path = "/publishers/{id}",
    tag = "publishers",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Publisher ID")),
    responses(
        (status = 200, description = "Publisher", body = Publisher),
        (status = 404, description = "Publisher not found")
    )
)]
pub async fn get_publisher(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Publisher>> {
    Ok(Json(state.services.catalog.get_publisher(id).await?))
}

/// Create publisher
#[utoipa::path(
    post,
    path = "/publishers",
    tag = "publishers",
    security(("bearer_auth" = [])),
    request_body = NameRequest,
    responses(
        (status = 201, description = "Publisher created", body = Publisher),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_publisher(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<NameRequest>,
) -> AppResult<(StatusCode, Json<Publisher>)> {
    claims.require_librarian()?;

    let created = state.services.catalog.create_publisher(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Rename publisher
#[utoipa::path(
    put,
    path = "/publishers/{id}",
    tag = "publishers",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Publisher ID")),
    request_body = NameRequest,
    responses(
        (status = 200, description = "Publisher updated", body = Publisher),
        (status = 404, description = "Publisher not found")
    )
)]
pub async fn update_publisher(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<NameRequest>,
) -> AppResult<Json<Publisher>> {
    claims.require_librarian()?;

    Ok(Json(state.services.catalog.update_publisher(id, request).await?))
}

/// Delete publisher
#[utoipa::path(
    delete,
    path = "/publishers/{id}",
    tag = "publishers",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Publisher ID")),
    responses(
        (status = 204, description = "Publisher deleted"),
        (status = 404, description = "Publisher not found")
    )
)]
pub async fn delete_publisher(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_librarian()?;

    state.services.catalog.delete_publisher(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
