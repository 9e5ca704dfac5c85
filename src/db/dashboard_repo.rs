// src/db/dashboard_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, Postgres};

use crate::{
    common::error::AppError,
    db::client_repo::SCOPE_PREDICATE,
    models::dashboard::{
        DailyActivityEntry, MonthlyActivityEntry, PipelineTotals, ReportCountRow, StatusCount,
    },
    services::visibility::ScopeFilter,
};

// Sem estado: toda consulta recebe o executor (pool, conexão ou transação)
#[derive(Clone, Default)]
pub struct DashboardRepository;

impl DashboardRepository {
    pub fn new() -> Self {
        Self
    }

    // 1. Contagem de clientes por etapa do funil
    pub async fn status_counts<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
    ) -> Result<Vec<StatusCount>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, StatusCount>(&format!(
            r#"
            SELECT status, COUNT(*) AS count
            FROM clients
            WHERE {SCOPE_PREDICATE}
            GROUP BY status
            ORDER BY status
            "#
        ))
        .bind(scope.all)
        .bind(&scope.owner_ids)
        .bind(scope.audit_eligible_only)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    // 2. Totais financeiros do funil
    pub async fn pipeline_totals<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
    ) -> Result<PipelineTotals, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let totals = sqlx::query_as::<_, PipelineTotals>(&format!(
            r#"
            SELECT
                COUNT(*) AS total_clients,
                COALESCE(SUM(estimated_value) FILTER (WHERE status <> 'LOST'), 0) AS open_pipeline_value,
                COALESCE(SUM(dpp), 0) AS total_dpp,
                COALESCE(SUM(dp_paid), 0) AS total_dp_paid
            FROM clients
            WHERE {SCOPE_PREDICATE}
            "#
        ))
        .bind(scope.all)
        .bind(&scope.owner_ids)
        .bind(scope.audit_eligible_only)
        .fetch_one(executor)
        .await?;
        Ok(totals)
    }

    pub async fn activities_on<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        day: NaiveDate,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM activities
            WHERE ($1 OR marketer_id = ANY($2)) AND activity_date = $3
            "#,
        )
        .bind(scope.all)
        .bind(&scope.owner_ids)
        .bind(day)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    // 3. Atividades por dia e tipo, dentro da janela
    pub async fn daily_activities<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyActivityEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, DailyActivityEntry>(
            r#"
            SELECT activity_date AS date, activity_type, COUNT(*) AS count
            FROM activities
            WHERE ($1 OR marketer_id = ANY($2))
              AND activity_date BETWEEN $3 AND $4
            GROUP BY activity_date, activity_type
            ORDER BY activity_date ASC, activity_type ASC
            "#,
        )
        .bind(scope.all)
        .bind(&scope.owner_ids)
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    // 4. Atividades por mês (YYYY-MM)
    pub async fn monthly_activities<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        since: NaiveDate,
    ) -> Result<Vec<MonthlyActivityEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, MonthlyActivityEntry>(
            r#"
            SELECT to_char(activity_date, 'YYYY-MM') AS month, COUNT(*) AS count
            FROM activities
            WHERE ($1 OR marketer_id = ANY($2))
              AND activity_date >= $3
            GROUP BY 1
            ORDER BY 1 ASC
            "#,
        )
        .bind(scope.all)
        .bind(&scope.owner_ids)
        .bind(since)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    // 5. Relatórios enviados (status diferente de DRAFT) por dono ativo no escopo
    pub async fn report_counts<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ReportCountRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ReportCountRow>(
            r#"
            SELECT
                u.id AS marketer_id,
                u.display_name,
                COUNT(r.id) AS reports_submitted
            FROM users u
            LEFT JOIN eod_reports r
                   ON r.marketer_id = u.id
                  AND r.report_date BETWEEN $3 AND $4
                  AND r.status <> 'DRAFT'
            WHERE ($1 OR u.id = ANY($2))
              AND u.role IN ('MARKETER', 'SUPERVISOR')
              AND u.is_active
            GROUP BY u.id, u.display_name
            ORDER BY u.display_name ASC
            "#,
        )
        .bind(scope.all)
        .bind(&scope.owner_ids)
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }
}
