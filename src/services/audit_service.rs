// src/services/audit_service.rs

use sqlx::{Acquire, Postgres};
use uuid::Uuid;

use crate::{
    common::{clock::BusinessClock, error::AppError},
    db::{AuditRepository, ClientRepository},
    models::{
        audit::{AssignmentOutcome, AuditChecklistItem, AuditQueueEntry, CheckStamp},
        auth::{Principal, UserRole},
        client::Client,
    },
    services::notification::{AssignmentNotice, AuditorRoster, Notifier},
};

#[derive(Clone)]
pub struct AuditService {
    repo: AuditRepository,
    client_repo: ClientRepository,
    roster: AuditorRoster,
    notifier: Notifier,
    clock: BusinessClock,
}

impl AuditService {
    pub fn new(
        repo: AuditRepository,
        client_repo: ClientRepository,
        roster: AuditorRoster,
        notifier: Notifier,
        clock: BusinessClock,
    ) -> Self {
        Self { repo, client_repo, roster, notifier, clock }
    }

    /// Checklist do cliente. Na primeira leitura de um cliente elegível os 7
    /// itens são criados; chamadas repetidas (ou concorrentes) não duplicam.
    pub async fn get_checklist<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        client_id: Uuid,
    ) -> Result<Vec<AuditChecklistItem>, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        ensure_audit_desk(principal)?;
        let mut conn = executor.acquire().await?;

        let client = self
            .client_repo
            .find_by_id(&mut *conn, client_id)
            .await?
            .ok_or_else(|| AppError::not_found("Cliente"))?;

        // Checklists existentes continuam legíveis mesmo que o cliente deixe de ser elegível
        if self.repo.count_items(&mut *conn, client_id).await? == 0 {
            if !client.is_audit_eligible() {
                return Err(AppError::InvalidInput(
                    "Cliente ainda não é elegível para auditoria.".to_string(),
                ));
            }
            let created = self.repo.insert_fixed_items(&mut *conn, client_id).await?;
            if created > 0 {
                tracing::info!("📋 Checklist criado para o cliente {}", client_id);
            }
        }

        self.repo.list_items(&mut *conn, client_id).await
    }

    pub async fn toggle_item<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        item_id: i64,
        checked: bool,
    ) -> Result<AuditChecklistItem, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        ensure_audit_desk(principal)?;
        let mut conn = executor.acquire().await?;

        let stamp = CheckStamp::for_toggle(checked, principal.user_id, self.clock.now());
        self.repo.set_item(&mut *conn, item_id, &stamp).await
    }

    /// Atribui o auditor. A notificação só acontece depois do commit e nunca
    /// desfaz a atribuição.
    pub async fn assign_auditor<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        client_id: Uuid,
        auditor_name: &str,
    ) -> Result<AssignmentOutcome, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        ensure_audit_desk(principal)?;
        let contact = self
            .roster
            .find(auditor_name)
            .cloned()
            .ok_or_else(|| {
                let known = self.roster.names().join(", ");
                AppError::invalid("auditorName", &format!("auditor fora do roster ({})", known))
            })?;

        let mut tx = executor.begin().await?;

        let client = self
            .client_repo
            .lock_by_id(&mut *tx, client_id)
            .await?
            .ok_or_else(|| AppError::not_found("Cliente"))?;
        if !client.is_audit_eligible() {
            return Err(AppError::InvalidInput(
                "Cliente ainda não é elegível para auditoria.".to_string(),
            ));
        }

        let client = self
            .client_repo
            .set_auditor(&mut *tx, client_id, Some(&contact.name), self.clock.today())
            .await?;
        tx.commit().await?;

        tracing::info!(
            "🧾 Cliente '{}' atribuído ao auditor {} por {}",
            client.name,
            contact.name,
            principal.user_id
        );

        let notice = AssignmentNotice::for_client(contact, &client);
        let notification = self.notifier.notify(&notice).await;

        Ok(AssignmentOutcome { client, notification })
    }

    /// Remove o auditor. O progresso do checklist é mantido.
    pub async fn unassign_auditor<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        client_id: Uuid,
    ) -> Result<Client, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        ensure_audit_desk(principal)?;
        let mut conn = executor.acquire().await?;

        let client = self
            .client_repo
            .set_auditor(&mut *conn, client_id, None, self.clock.today())
            .await?;
        tracing::info!("🧾 Auditor removido do cliente '{}'", client.name);
        Ok(client)
    }

    pub async fn audit_queue<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
    ) -> Result<Vec<AuditQueueEntry>, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        ensure_audit_desk(principal)?;
        let mut conn = executor.acquire().await?;
        self.repo.queue(&mut *conn).await
    }
}

fn ensure_audit_desk(principal: &Principal) -> Result<(), AppError> {
    match principal.role {
        UserRole::Manager | UserRole::Auditor => Ok(()),
        _ => Err(AppError::forbidden("Somente MANAGER ou AUDITOR acessam a auditoria.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_manager_and_auditor_reach_the_audit_desk() {
        let id = Uuid::new_v4();
        assert!(ensure_audit_desk(&Principal::new(id, UserRole::Manager)).is_ok());
        assert!(ensure_audit_desk(&Principal::new(id, UserRole::Auditor)).is_ok());
        let err = ensure_audit_desk(&Principal::new(id, UserRole::Marketer)).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
        assert!(ensure_audit_desk(&Principal::new(id, UserRole::Supervisor)).is_err());
    }
}
