// src/db/report_repo.rs

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{is_foreign_key_violation, AppError},
    models::report::{
        ClientProgressUpdate, EodReport, ProgressUpdateInput, ReportStatus, SubmitReportPayload,
    },
    services::visibility::ScopeFilter,
};

const REPORT_COLUMNS: &str = r#"
    id, report_date, marketer_id, summary, new_leads, follow_ups, deals_today,
    deal_value, constraints, support_needed, plan_tomorrow, status, submitted_at,
    review_note, reviewed_at, reviewed_by, created_at, updated_at
"#;

const UPDATE_COLUMNS: &str = "id, report_id, client_id, activity, prev_status, new_status, result";

// Sem estado: toda consulta recebe o executor (pool, conexão ou transação)
#[derive(Clone, Default)]
pub struct ReportRepository;

impl ReportRepository {
    pub fn new() -> Self {
        Self
    }

    /// Upsert por (data, marketer). A chave única faz uma inserção concorrente
    /// cair no UPDATE em vez de duplicar a linha.
    ///
    /// Com `only_if_draft`, a atualização só acontece se o relatório ainda for
    /// rascunho; caso contrário retorna `None`.
    pub async fn upsert<'e, E>(
        &self,
        executor: E,
        marketer_id: Uuid,
        payload: &SubmitReportPayload,
        status: ReportStatus,
        submitted_at: Option<DateTime<Utc>>,
        only_if_draft: bool,
    ) -> Result<Option<EodReport>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let report = sqlx::query_as::<_, EodReport>(&format!(
            r#"
            INSERT INTO eod_reports (
                report_date, marketer_id, summary, new_leads, follow_ups, deals_today,
                deal_value, constraints, support_needed, plan_tomorrow, status, submitted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT ON CONSTRAINT eod_reports_date_marketer_key DO UPDATE SET
                summary        = EXCLUDED.summary,
                new_leads      = EXCLUDED.new_leads,
                follow_ups     = EXCLUDED.follow_ups,
                deals_today    = EXCLUDED.deals_today,
                deal_value     = EXCLUDED.deal_value,
                constraints    = EXCLUDED.constraints,
                support_needed = EXCLUDED.support_needed,
                plan_tomorrow  = EXCLUDED.plan_tomorrow,
                status         = EXCLUDED.status,
                submitted_at   = EXCLUDED.submitted_at,
                updated_at     = NOW()
            WHERE NOT $13 OR eod_reports.status = 'DRAFT'
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(payload.report_date)
        .bind(marketer_id)
        .bind(&payload.summary)
        .bind(payload.new_leads)
        .bind(payload.follow_ups)
        .bind(payload.deals_today)
        .bind(payload.deal_value)
        .bind(payload.constraints.as_deref())
        .bind(payload.support_needed.as_deref())
        .bind(payload.plan_tomorrow.as_deref())
        .bind(status)
        .bind(submitted_at)
        .bind(only_if_draft)
        .fetch_optional(executor)
        .await?;

        Ok(report)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<EodReport>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let report = sqlx::query_as::<_, EodReport>(&format!(
            "SELECT {REPORT_COLUMNS} FROM eod_reports WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(report)
    }

    pub async fn find_by_date_and_owner<'e, E>(
        &self,
        executor: E,
        report_date: NaiveDate,
        marketer_id: Uuid,
    ) -> Result<Option<EodReport>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let report = sqlx::query_as::<_, EodReport>(&format!(
            "SELECT {REPORT_COLUMNS} FROM eod_reports WHERE report_date = $1 AND marketer_id = $2"
        ))
        .bind(report_date)
        .bind(marketer_id)
        .fetch_optional(executor)
        .await?;
        Ok(report)
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<EodReport>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reports = sqlx::query_as::<_, EodReport>(&format!(
            r#"
            SELECT {REPORT_COLUMNS}
            FROM eod_reports
            WHERE ($1 OR marketer_id = ANY($2))
              AND ($3::date IS NULL OR report_date >= $3)
              AND ($4::date IS NULL OR report_date <= $4)
            ORDER BY report_date DESC, submitted_at DESC NULLS LAST
            "#
        ))
        .bind(scope.all)
        .bind(&scope.owner_ids)
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await?;
        Ok(reports)
    }

    pub async fn set_review<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: ReportStatus,
        note: Option<&str>,
        reviewer_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<EodReport, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let report = sqlx::query_as::<_, EodReport>(&format!(
            r#"
            UPDATE eod_reports SET
                status = $2, review_note = $3, reviewed_by = $4, reviewed_at = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(note)
        .bind(reviewer_id)
        .bind(now)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::not_found("Relatório"))?;
        Ok(report)
    }

    // =========================================================================
    //  ATUALIZAÇÕES DE PROGRESSO (filhas do relatório)
    // =========================================================================

    pub async fn delete_updates<'e, E>(&self, executor: E, report_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM client_progress_updates WHERE report_id = $1")
            .bind(report_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn insert_update<'e, E>(
        &self,
        executor: E,
        report_id: Uuid,
        update: &ProgressUpdateInput,
    ) -> Result<ClientProgressUpdate, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, ClientProgressUpdate>(&format!(
            r#"
            INSERT INTO client_progress_updates
                (report_id, client_id, activity, prev_status, new_status, result)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {UPDATE_COLUMNS}
            "#
        ))
        .bind(report_id)
        .bind(update.client_id)
        .bind(&update.activity)
        .bind(update.prev_status)
        .bind(update.new_status)
        .bind(update.result.as_deref())
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                return AppError::not_found(format!("Cliente {}", update.client_id));
            }
            e.into()
        })?;
        Ok(row)
    }

    pub async fn list_updates<'e, E>(
        &self,
        executor: E,
        report_ids: &[Uuid],
    ) -> Result<Vec<ClientProgressUpdate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ClientProgressUpdate>(&format!(
            "SELECT {UPDATE_COLUMNS} FROM client_progress_updates WHERE report_id = ANY($1) ORDER BY id"
        ))
        .bind(report_ids)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }
}
