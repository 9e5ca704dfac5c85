// src/handlers/users.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{ManagerOnly, RequireRole},
    models::auth::{CreateUserPayload, Principal, UpdateUserPayload, User},
};

// GET /api/users
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    responses(
        (status = 200, description = "Usuários visíveis ao solicitante", body = Vec<User>)
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    let users = app_state
        .user_service
        .list_users(&app_state.db_pool, &principal)
        .await?;

    Ok(Json(users))
}

// POST /api/users
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "Usuário criado", body = User),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Somente MANAGER"),
        (status = 409, description = "E-mail já existe")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn create_user(
    State(app_state): State<AppState>,
    guard: RequireRole<ManagerOnly>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let user = app_state
        .user_service
        .create_user(&app_state.db_pool, guard.principal(), payload)
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

// PUT /api/users
#[utoipa::path(
    put,
    path = "/api/users",
    tag = "Users",
    request_body = UpdateUserPayload,
    responses(
        (status = 200, description = "Usuário atualizado", body = User),
        (status = 403, description = "Somente MANAGER"),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn update_user(
    State(app_state): State<AppState>,
    guard: RequireRole<ManagerOnly>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let user = app_state
        .user_service
        .update_user(&app_state.db_pool, guard.principal(), payload)
        .await?;

    Ok(Json(user))
}
