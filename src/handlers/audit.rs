// src/handlers/audit.rs

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{AuditDesk, RequireRole},
    models::{
        audit::{
            AssignAuditorPayload, AssignmentOutcome, AuditChecklistItem,
            ToggleChecklistPayload, UnassignAuditorPayload,
        },
        client::Client,
    },
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChecklistQuery {
    /// Ausente: devolve a fila de auditoria
    pub client_id: Option<Uuid>,
}

// GET /api/audit_checklist
#[utoipa::path(
    get,
    path = "/api/audit_checklist",
    tag = "Audit",
    params(ChecklistQuery),
    responses(
        (status = 200, description = "Checklist do cliente (7 itens, ordem fixa); sem `client_id`, a fila de auditoria (`AuditQueueEntry[]`)", body = Vec<AuditChecklistItem>),
        (status = 400, description = "Cliente não elegível para auditoria"),
        (status = 403, description = "Somente MANAGER ou AUDITOR"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn get_checklist(
    State(app_state): State<AppState>,
    guard: RequireRole<AuditDesk>,
    Query(query): Query<ChecklistQuery>,
) -> Result<Response, AppError> {
    let response = match query.client_id {
        Some(client_id) => Json(
            app_state
                .audit_service
                .get_checklist(&app_state.db_pool, guard.principal(), client_id)
                .await?,
        )
        .into_response(),
        None => Json(
            app_state
                .audit_service
                .audit_queue(&app_state.db_pool, guard.principal())
                .await?,
        )
        .into_response(),
    };

    Ok(response)
}

// PUT /api/audit_checklist
#[utoipa::path(
    put,
    path = "/api/audit_checklist",
    tag = "Audit",
    request_body = ToggleChecklistPayload,
    responses(
        (status = 200, description = "Item marcado ou desmarcado", body = AuditChecklistItem),
        (status = 403, description = "Somente MANAGER ou AUDITOR"),
        (status = 404, description = "Item não encontrado")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn toggle_item(
    State(app_state): State<AppState>,
    guard: RequireRole<AuditDesk>,
    Json(payload): Json<ToggleChecklistPayload>,
) -> Result<impl IntoResponse, AppError> {
    let item = app_state
        .audit_service
        .toggle_item(&app_state.db_pool, guard.principal(), payload.item_id, payload.checked)
        .await?;

    Ok(Json(item))
}

// POST /api/audit_checklist/assign
#[utoipa::path(
    post,
    path = "/api/audit_checklist/assign",
    tag = "Audit",
    request_body = AssignAuditorPayload,
    responses(
        (status = 200, description = "Auditor designado; resultado das notificações por canal", body = AssignmentOutcome),
        (status = 400, description = "Auditor fora do roster ou cliente não elegível"),
        (status = 403, description = "Somente MANAGER ou AUDITOR"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn assign_auditor(
    State(app_state): State<AppState>,
    guard: RequireRole<AuditDesk>,
    Json(payload): Json<AssignAuditorPayload>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = app_state
        .audit_service
        .assign_auditor(
            &app_state.db_pool,
            guard.principal(),
            payload.client_id,
            &payload.auditor_name,
        )
        .await?;

    Ok(Json(outcome))
}

// POST /api/audit_checklist/unassign
#[utoipa::path(
    post,
    path = "/api/audit_checklist/unassign",
    tag = "Audit",
    request_body = UnassignAuditorPayload,
    responses(
        (status = 200, description = "Designação removida; o checklist é mantido", body = Client),
        (status = 403, description = "Somente MANAGER ou AUDITOR"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn unassign_auditor(
    State(app_state): State<AppState>,
    guard: RequireRole<AuditDesk>,
    Json(payload): Json<UnassignAuditorPayload>,
) -> Result<impl IntoResponse, AppError> {
    let client = app_state
        .audit_service
        .unassign_auditor(&app_state.db_pool, guard.principal(), payload.client_id)
        .await?;

    Ok(Json(client))
}
