// src/models/report.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::client::{validate_not_negative, ClientStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "report_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Draft,
    Submitted,
    Approved,
    Revision,
}

impl ReportStatus {
    /// Transições permitidas do relatório:
    /// DRAFT → SUBMITTED → {APPROVED | REVISION}, REVISION → SUBMITTED.
    /// Reenviar um relatório APPROVED também volta para SUBMITTED.
    pub fn can_transition(self, to: ReportStatus) -> bool {
        use ReportStatus::*;
        match (self, to) {
            (Draft, Draft) => true,
            (_, Submitted) => true,
            (Submitted, Approved) | (Submitted, Revision) => true,
            _ => false,
        }
    }

    /// Transições que só MANAGER / SUPERVISOR da equipe podem fazer.
    pub fn is_review_outcome(self) -> bool {
        matches!(self, ReportStatus::Approved | ReportStatus::Revision)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EodReport {
    pub id: Uuid,
    pub report_date: NaiveDate,
    pub marketer_id: Uuid,
    pub summary: String,
    pub new_leads: i32,
    pub follow_ups: i32,
    pub deals_today: i32,
    pub deal_value: Decimal,
    pub constraints: Option<String>,
    pub support_needed: Option<String>,
    pub plan_tomorrow: Option<String>,
    pub status: ReportStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub review_note: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Linha filha do relatório: existe só enquanto o relatório existir
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientProgressUpdate {
    pub id: i64,
    pub report_id: Uuid,
    pub client_id: Uuid,
    pub activity: String,
    pub prev_status: ClientStatus,
    pub new_status: ClientStatus,
    pub result: Option<String>,
}

/// Relatório sempre acompanhado das suas atualizações de progresso.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportWithUpdates {
    #[serde(flatten)]
    pub report: EodReport,
    pub progress_updates: Vec<ClientProgressUpdate>,
}

// --- PAYLOADS ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdateInput {
    pub client_id: Uuid,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Texto da atividade muito longo."))]
    pub activity: String,
    pub prev_status: ClientStatus,
    pub new_status: ClientStatus,
    pub result: Option<String>,
}

impl ProgressUpdateInput {
    pub fn changes_status(&self) -> bool {
        self.prev_status != self.new_status
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportPayload {
    pub report_date: NaiveDate,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "Não pode ser negativo."))]
    pub new_leads: i32,
    #[serde(default)]
    #[validate(range(min = 0, message = "Não pode ser negativo."))]
    pub follow_ups: i32,
    #[serde(default)]
    #[validate(range(min = 0, message = "Não pode ser negativo."))]
    pub deals_today: i32,
    #[serde(default)]
    #[validate(custom(function = "validate_not_negative"))]
    pub deal_value: Decimal,
    pub constraints: Option<String>,
    pub support_needed: Option<String>,
    pub plan_tomorrow: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub progress_updates: Vec<ProgressUpdateInput>,
    // true = salvar rascunho (sem cascata)
    #[serde(default)]
    pub draft: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReportPayload {
    pub id: Uuid,
    pub status: ReportStatus,
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReportStatus::*;

    #[test]
    fn review_only_from_submitted() {
        assert!(Submitted.can_transition(Approved));
        assert!(Submitted.can_transition(Revision));
        assert!(!Draft.can_transition(Approved));
        assert!(!Revision.can_transition(Approved));
        assert!(!Approved.can_transition(Revision));
    }

    #[test]
    fn resubmission_is_always_allowed() {
        for from in [Draft, Submitted, Approved, Revision] {
            assert!(from.can_transition(Submitted));
        }
    }

    #[test]
    fn draft_cannot_return_once_submitted() {
        assert!(Draft.can_transition(Draft));
        assert!(!Submitted.can_transition(Draft));
        assert!(!Revision.can_transition(Draft));
    }

    #[test]
    fn negative_counters_fail_validation() {
        let payload: SubmitReportPayload = serde_json::from_str(
            r#"{"reportDate":"2024-06-01","newLeads":-1}"#,
        )
        .unwrap();
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("new_leads"));
    }
}
