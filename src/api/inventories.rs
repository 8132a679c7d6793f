//! Inventory (physical copy) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::inventory::{CreateInventory, Inventory, InventoryQuery},
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List copies
#[utoipa::path(
    get,
    path = "/inventories",
    tag = "inventories",
    security(("bearer_auth" = [])),
    params(InventoryQuery),
    responses(
        (status = 200, description = "List of copies", body = PaginatedResponse<Inventory>)
    )
)]
pub async fn list_inventories(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<InventoryQuery>,
) -> AppResult<Json<PaginatedResponse<Inventory>>> {
    let (copies, total) = state.services.catalog.search_inventories(&query).await?;

    Ok(Json(PaginatedResponse::new(copies, total, query.page, query.per_page)))
}

#[utoipa::path(
    get,
    path = "/inventories/{id}",
    tag = "inventories",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Inventory ID")),
    responses(
        (status = 200, description = "Copy", body = Inventory),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn get_inventory(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Inventory>> {
    Ok(Json(state.services.catalog.get_inventory(id).await?))
}

/// Add a copy to a book (its quantity grows by one)
#[utoipa::path(
    post,
    path = "/inventories",
    tag = "inventories",
    security(("bearer_auth" = [])),
    request_body = CreateInventory,
    responses(
        (status = 201, description = "Copy added", body = Inventory),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_inventory(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateInventory>,
) -> AppResult<(StatusCode, Json<Inventory>)> {
    claims.require_librarian()?;

    let created = state.services.catalog.create_inventory(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Remove a never-issued available copy (its book's quantity shrinks by one)
#[utoipa::path(
    delete,
    path = "/inventories/{id}",
    tag = "inventories",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Inventory ID")),
    responses(
        (status = 204, description = "Copy removed"),
        (status = 404, description = "Copy not found"),
        (status = 422, description = "Copy was issued or is not available", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_inventory(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_librarian()?;

    state.services.catalog.delete_inventory(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
