// src/handlers/reports.rs

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        auth::Principal,
        report::{ReportWithUpdates, ReviewReportPayload, SubmitReportPayload},
    },
    services::{report_service::ReportFilters, visibility::ScopeRequest},
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListReportsQuery {
    pub scope: Option<String>,
    pub owner_id: Option<Uuid>,
    pub id: Option<Uuid>,
    /// Dia exato (tem prioridade sobre `from`/`to`)
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// GET /api/reports
#[utoipa::path(
    get,
    path = "/api/reports",
    tag = "Reports",
    params(ListReportsQuery),
    responses(
        (status = 200, description = "Relatórios no escopo, com atualizações de progresso", body = Vec<ReportWithUpdates>),
        (status = 403, description = "AUDITOR não lê relatórios")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn list_reports(
    State(app_state): State<AppState>,
    principal: Principal,
    Query(query): Query<ListReportsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let request = ScopeRequest::from_parts(query.scope.as_deref(), query.owner_id);
    let filters = ReportFilters {
        id: query.id,
        date: query.date,
        from: query.from,
        to: query.to,
    };

    let reports = app_state
        .report_service
        .list_reports(&app_state.db_pool, &principal, &request, filters)
        .await?;

    Ok(Json(reports))
}

// POST /api/reports
#[utoipa::path(
    post,
    path = "/api/reports",
    tag = "Reports",
    request_body = SubmitReportPayload,
    responses(
        (status = 200, description = "Relatório enviado (ou rascunho salvo com `draft: true`)", body = ReportWithUpdates),
        (status = 400, description = "Dados inválidos ou rascunho já enviado"),
        (status = 403, description = "Cliente fora do escopo de escrita; nada foi gravado"),
        (status = 404, description = "Cliente da atualização não existe; nada foi gravado")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn submit_report(
    State(app_state): State<AppState>,
    principal: Principal,
    Json(payload): Json<SubmitReportPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let report = if payload.draft {
        app_state
            .report_service
            .save_draft(&app_state.db_pool, &principal, payload)
            .await?
    } else {
        app_state
            .report_service
            .submit_report(&app_state.db_pool, &principal, payload)
            .await?
    };

    Ok(Json(report))
}

// PUT /api/reports
#[utoipa::path(
    put,
    path = "/api/reports",
    tag = "Reports",
    request_body = ReviewReportPayload,
    responses(
        (status = 200, description = "Relatório revisado", body = ReportWithUpdates),
        (status = 400, description = "Transição inválida"),
        (status = 403, description = "Sem permissão para revisar"),
        (status = 404, description = "Relatório não encontrado")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn review_report(
    State(app_state): State<AppState>,
    principal: Principal,
    Json(payload): Json<ReviewReportPayload>,
) -> Result<impl IntoResponse, AppError> {
    let report = app_state
        .report_service
        .review_report(&app_state.db_pool, &principal, payload)
        .await?;

    Ok(Json(report))
}
