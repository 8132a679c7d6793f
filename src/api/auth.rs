//! Token and registration endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::user::{RegisterUser, TokenPair, User},
};

use super::AuthenticatedUser;

/// Login request
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Refresh request
#[derive(Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// New access token
#[derive(Serialize, ToSchema)]
pub struct AccessResponse {
    pub access: String,
}

/// Token verification request
#[derive(Deserialize, ToSchema)]
pub struct VerifyRequest {
    pub token: String,
}

/// Empty body returned by a successful verification
#[derive(Serialize, ToSchema)]
pub struct VerifyResponse {}

/// Registration result: the new account and its tokens
#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub access: String,
    pub refresh: String,
    pub user: User,
}

/// Obtain an access/refresh token pair
#[utoipa::path(
    post,
    path = "/token",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Tokens issued", body = TokenPair),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn obtain_token(
    State(state): State<crate::AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<TokenPair>> {
    let tokens = state
        .services
        .auth
        .login(&request.username, &request.password)
        .await?;
    Ok(Json(tokens))
}

/// Exchange a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/token/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Access token issued", body = AccessResponse),
        (status = 401, description = "Invalid or expired refresh token", body = crate::error::ErrorResponse)
    )
)]
pub async fn refresh_token(
    State(state): State<crate::AppState>,
    Json(request): Json<RefreshRequest>,
) -> AppResult<Json<AccessResponse>> {
    let access = state.services.auth.refresh(&request.refresh).await?;
    Ok(Json(AccessResponse { access }))
}

/// Check that a token is valid
#[utoipa::path(
    post,
    path = "/token/verify",
    tag = "auth",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Token is valid", body = VerifyResponse),
        (status = 401, description = "Token is invalid or expired", body = crate::error::ErrorResponse)
    )
)]
pub async fn verify_token(
    State(state): State<crate::AppState>,
    Json(request): Json<VerifyRequest>,
) -> AppResult<Json<VerifyResponse>> {
    state.services.auth.verify(&request.token)?;
    Ok(Json(VerifyResponse {}))
}

/// Register as a reader
#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "Reader registered", body = RegisterResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Username, passport or phone already used", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    Json(request): Json<RegisterUser>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let (tokens, user) = state.services.auth.register(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            access: tokens.access,
            refresh: tokens.refresh,
            user,
        }),
    ))
}

/// Get current user info
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<User>> {
    let user = state.services.auth.me(&claims).await?;
    Ok(Json(user))
}
