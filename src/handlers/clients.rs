// src/handlers/clients.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        auth::Principal,
        client::{
            BulkImportPayload, Client, ClientStatus, ClientView, CreateClientPayload,
            ImportResult, UpdateClientPayload,
        },
    },
    services::{client_service::ClientFilters, visibility::ScopeRequest},
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListClientsQuery {
    /// `team` para o SUPERVISOR ver a equipe
    pub scope: Option<String>,
    pub owner_id: Option<Uuid>,
    pub id: Option<Uuid>,
    pub status: Option<ClientStatus>,
    /// Apenas clientes parados (7+ dias sem atualização)
    pub stagnant_only: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteClientQuery {
    pub id: Uuid,
}

// GET /api/clients
#[utoipa::path(
    get,
    path = "/api/clients",
    tag = "Clients",
    params(ListClientsQuery),
    responses(
        (status = 200, description = "Clientes no escopo, com campos derivados", body = Vec<ClientView>)
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn list_clients(
    State(app_state): State<AppState>,
    principal: Principal,
    Query(query): Query<ListClientsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let request = ScopeRequest::from_parts(query.scope.as_deref(), query.owner_id);
    let filters = ClientFilters {
        id: query.id,
        status: query.status,
        stagnant_only: query.stagnant_only.unwrap_or(false),
    };

    let clients = app_state
        .client_service
        .list_clients(&app_state.db_pool, &principal, &request, filters)
        .await?;

    Ok(Json(clients))
}

// POST /api/clients
#[utoipa::path(
    post,
    path = "/api/clients",
    tag = "Clients",
    request_body = CreateClientPayload,
    responses(
        (status = 201, description = "Cliente criado", body = Client),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Dono fora do escopo de escrita")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn create_client(
    State(app_state): State<AppState>,
    principal: Principal,
    Json(payload): Json<CreateClientPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let client = app_state
        .client_service
        .create_client(&app_state.db_pool, &principal, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(client)))
}

// PUT /api/clients
#[utoipa::path(
    put,
    path = "/api/clients",
    tag = "Clients",
    request_body = UpdateClientPayload,
    responses(
        (status = 200, description = "Cliente atualizado", body = Client),
        (status = 403, description = "Sem permissão para este cliente ou campo"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn update_client(
    State(app_state): State<AppState>,
    principal: Principal,
    Json(payload): Json<UpdateClientPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let client = app_state
        .client_service
        .update_client(&app_state.db_pool, &principal, payload)
        .await?;

    Ok(Json(client))
}

// PATCH /api/clients (importação em massa)
#[utoipa::path(
    patch,
    path = "/api/clients",
    tag = "Clients",
    request_body = BulkImportPayload,
    responses(
        (status = 200, description = "Linhas importadas e ignoradas", body = ImportResult),
        (status = 403, description = "Dono fora do escopo de escrita")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn bulk_import(
    State(app_state): State<AppState>,
    principal: Principal,
    Json(payload): Json<BulkImportPayload>,
) -> Result<impl IntoResponse, AppError> {
    let result = app_state
        .client_service
        .bulk_import(&app_state.db_pool, &principal, payload)
        .await?;

    Ok(Json(result))
}

// DELETE /api/clients?id=
#[utoipa::path(
    delete,
    path = "/api/clients",
    tag = "Clients",
    params(DeleteClientQuery),
    responses(
        (status = 204, description = "Cliente removido"),
        (status = 403, description = "Fora do escopo de escrita"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn delete_client(
    State(app_state): State<AppState>,
    principal: Principal,
    Query(query): Query<DeleteClientQuery>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .client_service
        .delete_client(&app_state.db_pool, &principal, query.id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
