// src/handlers/dashboard.rs

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        auth::Principal,
        dashboard::{AnalyticsKind, AnalyticsPeriod, AnalyticsReport, DashboardSummary},
    },
    services::visibility::{ScopeQuery, ScopeRequest},
};

// GET /api/dashboard
#[utoipa::path(
    get,
    path = "/api/dashboard",
    tag = "Dashboard",
    params(ScopeQuery),
    responses(
        (status = 200, description = "Resumo do funil no escopo", body = DashboardSummary),
        (status = 401, description = "Não autorizado")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    principal: Principal,
    Query(query): Query<ScopeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state
        .dashboard_service
        .get_summary(&app_state.db_pool, &principal, &ScopeRequest::from(&query))
        .await?;

    Ok(Json(summary))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalyticsQuery {
    /// `daily_activities`, `monthly_activities` ou `eod_compliance`
    #[serde(rename = "type")]
    pub kind: String,
    /// `week` (padrão) ou `month`
    pub period: Option<String>,
    pub scope: Option<String>,
    pub owner_id: Option<Uuid>,
}

// Reaproveita o `snake_case` do serde para aceitar exatamente os nomes documentados
fn parse_choice<T: DeserializeOwned>(field: &str, raw: &str) -> Result<T, AppError> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_string()))
        .map_err(|_| AppError::invalid(field, &format!("valor desconhecido '{}'", raw)))
}

// GET /api/analytics
#[utoipa::path(
    get,
    path = "/api/analytics",
    tag = "Dashboard",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Série analítica (`{type, data}`)", body = AnalyticsReport),
        (status = 400, description = "Tipo ou período desconhecido"),
        (status = 403, description = "AUDITOR não acessa analytics")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn get_analytics(
    State(app_state): State<AppState>,
    principal: Principal,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let kind: AnalyticsKind = parse_choice("type", &query.kind)?;
    let period: AnalyticsPeriod = match query.period.as_deref() {
        Some(raw) if !raw.trim().is_empty() => parse_choice("period", raw)?,
        _ => AnalyticsPeriod::default(),
    };
    let request = ScopeRequest::from_parts(query.scope.as_deref(), query.owner_id);

    let report = app_state
        .dashboard_service
        .get_analytics(&app_state.db_pool, &principal, &request, kind, period)
        .await?;

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analytics_choices_accept_documented_names_only() {
        let kind: AnalyticsKind = parse_choice("type", "eod_compliance").unwrap();
        assert_eq!(kind, AnalyticsKind::EodCompliance);
        let period: AnalyticsPeriod = parse_choice("period", " month ").unwrap();
        assert_eq!(period, AnalyticsPeriod::Month);

        let err = parse_choice::<AnalyticsKind>("type", "yearly").unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(parse_choice::<AnalyticsPeriod>("period", "Week").is_err());
    }
}
