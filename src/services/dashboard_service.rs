// src/services/dashboard_service.rs

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use sqlx::{Acquire, Postgres};

use crate::{
    common::{clock::BusinessClock, error::AppError},
    db::{ClientRepository, DashboardRepository, ReportRepository},
    models::{
        auth::Principal,
        client::compute_stagnant,
        dashboard::{
            AnalyticsKind, AnalyticsPeriod, AnalyticsReport, ComplianceEntry, DashboardSummary,
            ReportCountRow,
        },
        report::ReportStatus,
    },
    services::visibility::{Scope, ScopeRequest, VisibilityResolver},
};

// Série mensal cobre os últimos 12 meses, incluindo o atual
const MONTHLY_SPAN_MONTHS: u32 = 12;

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
    client_repo: ClientRepository,
    report_repo: ReportRepository,
    visibility: VisibilityResolver,
    clock: BusinessClock,
}

impl DashboardService {
    pub fn new(
        repo: DashboardRepository,
        client_repo: ClientRepository,
        report_repo: ReportRepository,
        visibility: VisibilityResolver,
        clock: BusinessClock,
    ) -> Self {
        Self { repo, client_repo, report_repo, visibility, clock }
    }

    pub async fn get_summary<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        request: &ScopeRequest,
    ) -> Result<DashboardSummary, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;
        let today = self.clock.today();

        let scope = self.visibility.resolve_scope(&mut *conn, principal, request).await?;
        let clients_filter = scope.client_filter();

        let status_counts = self.repo.status_counts(&mut *conn, &clients_filter).await?;
        let totals = self.repo.pipeline_totals(&mut *conn, &clients_filter).await?;

        let clients = self.client_repo.list(&mut *conn, &clients_filter, None, None).await?;
        let mut stagnant_clients: Vec<_> = compute_stagnant(clients, today)
            .into_iter()
            .filter(|v| v.stagnant)
            .collect();
        stagnant_clients.sort_by(|a, b| b.days_stagnant.cmp(&a.days_stagnant));

        // Atividades e relatórios não existem na visão do AUDITOR
        let activities_today = match scope {
            Scope::AuditEligible => 0,
            _ => self.repo.activities_on(&mut *conn, &clients_filter, today).await?,
        };

        let eod_submitted_today = match scope.single_owner() {
            Some(owner) => Some(
                self.report_repo
                    .find_by_date_and_owner(&mut *conn, today, owner)
                    .await?
                    .is_some_and(|r| r.status != ReportStatus::Draft),
            ),
            None => None,
        };

        Ok(DashboardSummary {
            status_counts,
            total_clients: totals.total_clients,
            open_pipeline_value: totals.open_pipeline_value,
            total_dpp: totals.total_dpp,
            total_dp_paid: totals.total_dp_paid,
            stagnant_clients,
            activities_today,
            eod_submitted_today,
        })
    }

    pub async fn get_analytics<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        request: &ScopeRequest,
        kind: AnalyticsKind,
        period: AnalyticsPeriod,
    ) -> Result<AnalyticsReport, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;
        let today = self.clock.today();

        let scope = self.visibility.resolve_scope(&mut *conn, principal, request).await?;
        let filter = scope.owner_filter()?;

        let report = match kind {
            AnalyticsKind::DailyActivities => {
                let (from, to) = period.window(today);
                AnalyticsReport::DailyActivities(
                    self.repo.daily_activities(&mut *conn, &filter, from, to).await?,
                )
            }
            AnalyticsKind::MonthlyActivities => AnalyticsReport::MonthlyActivities(
                self.repo
                    .monthly_activities(&mut *conn, &filter, monthly_series_start(today))
                    .await?,
            ),
            AnalyticsKind::EodCompliance => {
                let (from, to) = period.window(today);
                let rows = self.repo.report_counts(&mut *conn, &filter, from, to).await?;
                AnalyticsReport::EodCompliance(compliance(rows, working_days(from, to)))
            }
        };
        Ok(report)
    }
}

/// Dias úteis (segunda a sábado) no intervalo inclusivo.
pub fn working_days(from: NaiveDate, to: NaiveDate) -> i64 {
    if to < from {
        return 0;
    }
    let mut count = 0;
    let mut day = from;
    while day <= to {
        if day.weekday() != Weekday::Sun {
            count += 1;
        }
        day += Duration::days(1);
    }
    count
}

pub fn compliance(rows: Vec<ReportCountRow>, working_days: i64) -> Vec<ComplianceEntry> {
    rows.into_iter()
        .map(|row| {
            let compliance_rate = if working_days > 0 {
                (row.reports_submitted as f64 / working_days as f64).min(1.0)
            } else {
                0.0
            };
            ComplianceEntry {
                marketer_id: row.marketer_id,
                display_name: row.display_name,
                working_days,
                reports_submitted: row.reports_submitted,
                compliance_rate,
            }
        })
        .collect()
}

/// Primeiro dia do mês, 11 meses antes do mês atual.
pub fn monthly_series_start(today: NaiveDate) -> NaiveDate {
    let months_back = MONTHLY_SPAN_MONTHS - 1;
    let total = today.year() * 12 + today.month0() as i32 - months_back as i32;
    let (year, month0) = (total.div_euclid(12), total.rem_euclid(12) as u32);
    NaiveDate::from_ymd_opt(year, month0 + 1, 1).unwrap_or(today)
}
