// src/services/report_service.rs

use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::{Acquire, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::{clock::BusinessClock, error::AppError},
    db::{ClientRepository, ReportRepository},
    models::{
        auth::{Principal, UserRole},
        client::{Client, ClientPatch},
        report::{
            ClientProgressUpdate, EodReport, ReportStatus, ReportWithUpdates, ReviewReportPayload,
            SubmitReportPayload,
        },
    },
    services::visibility::{ScopeRequest, VisibilityResolver},
};

/// Filtros de leitura de relatórios.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportFilters {
    pub id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct ReportService {
    repo: ReportRepository,
    client_repo: ClientRepository,
    visibility: VisibilityResolver,
    clock: BusinessClock,
}

impl ReportService {
    pub fn new(
        repo: ReportRepository,
        client_repo: ClientRepository,
        visibility: VisibilityResolver,
        clock: BusinessClock,
    ) -> Self {
        Self { repo, client_repo, visibility, clock }
    }

    // =========================================================================
    //  ENVIO (operação atômica)
    // =========================================================================

    /// Envia o relatório do dia. Upsert do relatório, troca completa das
    /// atualizações de progresso e cascata de status nos clientes acontecem
    /// numa única transação: ou tudo é gravado, ou nada.
    pub async fn submit_report<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        payload: SubmitReportPayload,
    ) -> Result<ReportWithUpdates, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        ensure_report_owner(principal)?;
        let now = self.clock.now();
        let today = self.clock.today();

        let mut tx = executor.begin().await?;

        // 1-2. Upsert por (data, dono): sempre volta para SUBMITTED
        let report = self
            .repo
            .upsert(&mut *tx, principal.user_id, &payload, ReportStatus::Submitted, Some(now), false)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Upsert do relatório não retornou linha"))?;

        // 3. Troca completa das filhas
        let updates = self.replace_updates(&mut *tx, report.id, &payload).await?;

        // 4. Cascata, na ordem do payload
        let mut cascaded = 0usize;
        for update in &payload.progress_updates {
            let client = self.lock_writable_client(&mut *tx, principal, update.client_id).await?;

            if update.changes_status() {
                self.client_repo
                    .apply_patch(&mut *tx, client.id, &ClientPatch::status_only(update.new_status), today)
                    .await?;
                cascaded += 1;
            }
        }

        tx.commit().await?;

        tracing::info!(
            "📝 Relatório {} de {} enviado: {} atualizações, {} mudanças de status",
            report.report_date,
            principal.user_id,
            updates.len(),
            cascaded
        );

        Ok(ReportWithUpdates { report, progress_updates: updates })
    }

    /// Salva rascunho: mesmo upsert e troca das filhas, sem cascata.
    /// Depois que o relatório sai de DRAFT, rascunhos são recusados.
    pub async fn save_draft<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        payload: SubmitReportPayload,
    ) -> Result<ReportWithUpdates, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        ensure_report_owner(principal)?;
        let mut tx = executor.begin().await?;

        let report = self
            .repo
            .upsert(&mut *tx, principal.user_id, &payload, ReportStatus::Draft, None, true)
            .await?
            .ok_or_else(|| {
                AppError::InvalidInput(
                    "Este relatório já foi enviado; não pode voltar a rascunho.".to_string(),
                )
            })?;

        let updates = self.replace_updates(&mut *tx, report.id, &payload).await?;

        // Mesma checagem de escrita do envio, sem cascata
        for update in &payload.progress_updates {
            self.lock_writable_client(&mut *tx, principal, update.client_id).await?;
        }
        tx.commit().await?;

        tracing::info!("💾 Rascunho de {} salvo para {}", report.report_date, principal.user_id);
        Ok(ReportWithUpdates { report, progress_updates: updates })
    }

    /// Trava o cliente de uma atualização e exige escrita do principal sobre o dono.
    async fn lock_writable_client(
        &self,
        conn: &mut PgConnection,
        principal: &Principal,
        client_id: Uuid,
    ) -> Result<Client, AppError> {
        let client = self
            .client_repo
            .lock_by_id(&mut *conn, client_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Cliente {}", client_id)))?;

        self.visibility
            .ensure_can_write(&mut *conn, principal, client.marketer_id)
            .await?;
        Ok(client)
    }

    async fn replace_updates(
        &self,
        conn: &mut PgConnection,
        report_id: Uuid,
        payload: &SubmitReportPayload,
    ) -> Result<Vec<ClientProgressUpdate>, AppError> {
        self.repo.delete_updates(&mut *conn, report_id).await?;

        let mut inserted = Vec::with_capacity(payload.progress_updates.len());
        for update in &payload.progress_updates {
            inserted.push(self.repo.insert_update(&mut *conn, report_id, update).await?);
        }
        Ok(inserted)
    }

    // =========================================================================
    //  REVISÃO (MANAGER / SUPERVISOR da equipe)
    // =========================================================================

    pub async fn review_report<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        payload: ReviewReportPayload,
    ) -> Result<ReportWithUpdates, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        if !payload.status.is_review_outcome() {
            return Err(AppError::invalid("status", "use APPROVED ou REVISION"));
        }

        let mut tx = executor.begin().await?;

        let report = self
            .repo
            .find_by_id(&mut *tx, payload.id)
            .await?
            .ok_or_else(|| AppError::not_found("Relatório"))?;

        let allowed = match principal.role {
            UserRole::Manager => true,
            UserRole::Supervisor => {
                report.marketer_id != principal.user_id
                    && self
                        .visibility
                        .can_write(&mut *tx, principal, report.marketer_id)
                        .await?
            }
            UserRole::Marketer | UserRole::Auditor => false,
        };
        if !allowed {
            return Err(AppError::forbidden("Você não pode revisar este relatório."));
        }

        if !report.status.can_transition(payload.status) {
            return Err(AppError::InvalidInput(format!(
                "Não é possível passar de {:?} para {:?}.",
                report.status, payload.status
            )));
        }

        let note = payload.note.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let reviewed = self
            .repo
            .set_review(&mut *tx, report.id, payload.status, note, principal.user_id, self.clock.now())
            .await?;
        let updates = self.repo.list_updates(&mut *tx, &[reviewed.id]).await?;
        tx.commit().await?;

        tracing::info!(
            "✅ Relatório {} revisado por {}: {:?}",
            reviewed.id,
            principal.user_id,
            reviewed.status
        );
        Ok(ReportWithUpdates { report: reviewed, progress_updates: updates })
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn list_reports<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        request: &ScopeRequest,
        filters: ReportFilters,
    ) -> Result<Vec<ReportWithUpdates>, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;

        let scope = self.visibility.resolve_scope(&mut *conn, principal, request).await?;
        let filter = scope.owner_filter()?;

        let (from, to) = match filters.date {
            Some(day) => (Some(day), Some(day)),
            None => (filters.from, filters.to),
        };
        let mut reports = self.repo.list(&mut *conn, &filter, from, to).await?;
        if let Some(id) = filters.id {
            reports.retain(|r| r.id == id);
        }

        self.map_reports(&mut *conn, reports).await
    }

    pub async fn get_report<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        request: &ScopeRequest,
        id: Uuid,
    ) -> Result<ReportWithUpdates, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        self.list_reports(executor, principal, request, ReportFilters { id: Some(id), ..Default::default() })
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("Relatório"))
    }

    /// Todo relatório sai com as suas atualizações de progresso.
    async fn map_reports(
        &self,
        conn: &mut PgConnection,
        reports: Vec<EodReport>,
    ) -> Result<Vec<ReportWithUpdates>, AppError> {
        let ids: Vec<Uuid> = reports.iter().map(|r| r.id).collect();
        let children = self.repo.list_updates(&mut *conn, &ids).await?;
        Ok(attach_updates(reports, children))
    }
}

/// Agrupa as filhas por relatório, preservando a ordem de inserção.
pub fn attach_updates(
    reports: Vec<EodReport>,
    updates: Vec<ClientProgressUpdate>,
) -> Vec<ReportWithUpdates> {
    let mut by_report: HashMap<Uuid, Vec<ClientProgressUpdate>> = HashMap::new();
    for update in updates {
        by_report.entry(update.report_id).or_default().push(update);
    }

    reports
        .into_iter()
        .map(|report| {
            let progress_updates = by_report.remove(&report.id).unwrap_or_default();
            ReportWithUpdates { report, progress_updates }
        })
        .collect()
}

// Relatórios pertencem a quem toca o funil; o dono é sempre o próprio principal
fn ensure_report_owner(principal: &Principal) -> Result<(), AppError> {
    if principal.role.owns_pipeline() {
        Ok(())
    } else {
        Err(AppError::forbidden("Somente MARKETER ou SUPERVISOR enviam relatórios."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::client::ClientStatus;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn report(id: Uuid) -> EodReport {
        EodReport {
            id,
            report_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            marketer_id: Uuid::new_v4(),
            summary: String::new(),
            new_leads: 0,
            follow_ups: 0,
            deals_today: 0,
            deal_value: Decimal::ZERO,
            constraints: None,
            support_needed: None,
            plan_tomorrow: None,
            status: ReportStatus::Submitted,
            submitted_at: Some(Utc::now()),
            review_note: None,
            reviewed_at: None,
            reviewed_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn update(id: i64, report_id: Uuid) -> ClientProgressUpdate {
        ClientProgressUpdate {
            id,
            report_id,
            client_id: Uuid::new_v4(),
            activity: "visita".into(),
            prev_status: ClientStatus::New,
            new_status: ClientStatus::Visit,
            result: None,
        }
    }

    #[test]
    fn every_report_gets_its_own_children_in_order() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mapped = attach_updates(
            vec![report(a), report(b), report(c)],
            vec![update(1, a), update(2, b), update(3, a)],
        );

        assert_eq!(mapped.len(), 3);
        let ids: Vec<i64> = mapped[0].progress_updates.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(mapped[1].progress_updates.len(), 1);
        assert!(mapped[2].progress_updates.is_empty());
    }

    #[test]
    fn only_pipeline_roles_own_reports() {
        let id = Uuid::new_v4();
        assert!(ensure_report_owner(&Principal::new(id, UserRole::Marketer)).is_ok());
        assert!(ensure_report_owner(&Principal::new(id, UserRole::Supervisor)).is_ok());
        assert!(ensure_report_owner(&Principal::new(id, UserRole::Manager)).is_err());
        assert!(ensure_report_owner(&Principal::new(id, UserRole::Auditor)).is_err());
    }
}
