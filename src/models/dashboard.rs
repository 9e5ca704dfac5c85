// src/models/dashboard.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::activity::ActivityType;
use crate::models::client::{ClientStatus, ClientView};

// 1. Resumo do painel
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub status_counts: Vec<StatusCount>,
    pub total_clients: i64,
    pub open_pipeline_value: Decimal, // Soma de estimatedValue, exceto LOST
    pub total_dpp: Decimal,
    pub total_dp_paid: Decimal,
    pub stagnant_clients: Vec<ClientView>,
    pub activities_today: i64,
    // Só faz sentido em escopo de dono; None para MANAGER/AUDITOR
    pub eod_submitted_today: Option<bool>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: ClientStatus,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct PipelineTotals {
    pub total_clients: i64,
    pub open_pipeline_value: Decimal,
    pub total_dpp: Decimal,
    pub total_dp_paid: Decimal,
}

// 2. Analytics

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsKind {
    DailyActivities,
    MonthlyActivities,
    EodCompliance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsPeriod {
    #[default]
    Week,
    Month,
}

impl AnalyticsPeriod {
    pub fn days(self) -> i64 {
        match self {
            AnalyticsPeriod::Week => 7,
            AnalyticsPeriod::Month => 30,
        }
    }

    /// Janela [início, hoje], inclusiva, terminando hoje.
    pub fn window(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        (today - chrono::Duration::days(self.days() - 1), today)
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivityEntry {
    pub date: NaiveDate,
    pub activity_type: ActivityType,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyActivityEntry {
    #[schema(example = "2024-06")]
    pub month: String,
    pub count: i64,
}

// Linha crua: quantos relatórios enviados por dono na janela
#[derive(Debug, Clone, FromRow)]
pub struct ReportCountRow {
    pub marketer_id: Uuid,
    pub display_name: String,
    pub reports_submitted: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceEntry {
    pub marketer_id: Uuid,
    pub display_name: String,
    pub working_days: i64,
    pub reports_submitted: i64,
    // 0.0 a 1.0
    pub compliance_rate: f64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AnalyticsReport {
    DailyActivities(Vec<DailyActivityEntry>),
    MonthlyActivities(Vec<MonthlyActivityEntry>),
    EodCompliance(Vec<ComplianceEntry>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn week_window_spans_seven_days_including_today() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 7).unwrap();
        let (from, to) = AnalyticsPeriod::Week.window(today);
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(to, today);
    }

    #[test]
    fn query_labels_are_snake_case() {
        let kind: AnalyticsKind = serde_json::from_str("\"eod_compliance\"").unwrap();
        assert_eq!(kind, AnalyticsKind::EodCompliance);
        let period: AnalyticsPeriod = serde_json::from_str("\"month\"").unwrap();
        assert_eq!(period.days(), 30);
    }
}
