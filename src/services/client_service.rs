// src/services/client_service.rs

use std::collections::HashSet;

use rust_decimal::Decimal;
use sqlx::{Acquire, Postgres};
use uuid::Uuid;

use crate::{
    common::{clock::BusinessClock, error::AppError},
    db::{client_repo::NewClient, ClientRepository},
    models::{
        auth::{Principal, UserRole},
        client::{
            compute_stagnant, BulkImportPayload, Client, ClientStatus, ClientView,
            CreateClientPayload, ImportResult, ImportRow, SkippedRow, UpdateClientPayload,
        },
    },
    services::visibility::{ScopeRequest, VisibilityResolver},
};

/// Filtros de leitura além do escopo.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientFilters {
    pub id: Option<Uuid>,
    pub status: Option<ClientStatus>,
    pub stagnant_only: bool,
}

#[derive(Clone)]
pub struct ClientService {
    repo: ClientRepository,
    visibility: VisibilityResolver,
    clock: BusinessClock,
}

impl ClientService {
    pub fn new(repo: ClientRepository, visibility: VisibilityResolver, clock: BusinessClock) -> Self {
        Self { repo, visibility, clock }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn list_clients<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        request: &ScopeRequest,
        filters: ClientFilters,
    ) -> Result<Vec<ClientView>, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;

        let scope = self.visibility.resolve_scope(&mut *conn, principal, request).await?;
        let clients = self
            .repo
            .list(&mut *conn, &scope.client_filter(), filters.status, filters.id)
            .await?;

        let mut views = compute_stagnant(clients, self.clock.today());
        if filters.stagnant_only {
            views.retain(|v| v.stagnant);
        }
        Ok(views)
    }

    // =========================================================================
    //  CRIAÇÃO
    // =========================================================================

    pub async fn create_client<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        payload: CreateClientPayload,
    ) -> Result<Client, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;

        let owner_id = self.resolve_owner(&mut *conn, principal, payload.owner_id).await?;

        let new = NewClient {
            owner_id,
            name: payload.name.trim(),
            phone: payload.phone.as_deref(),
            notes: payload.notes.as_deref(),
            status: payload.status.unwrap_or(ClientStatus::New),
            estimated_value: payload.estimated_value.unwrap_or(Decimal::ZERO),
            dpp: payload.dpp.unwrap_or(Decimal::ZERO),
            dp_paid: payload.dp_paid.unwrap_or(Decimal::ZERO),
        };

        let client = self.repo.create_client(&mut *conn, &new, self.clock.today()).await?;
        tracing::info!(
            "🆕 Cliente '{}' criado para o dono {} (status {})",
            client.name,
            owner_id,
            client.status.as_str()
        );
        Ok(client)
    }

    /// Dono efetivo de um registro novo. MARKETER sempre cria para si;
    /// os demais precisam ter escrita sobre o dono pedido.
    async fn resolve_owner(
        &self,
        conn: &mut sqlx::PgConnection,
        principal: &Principal,
        requested: Option<Uuid>,
    ) -> Result<Uuid, AppError> {
        let owner_id = match (principal.role, requested) {
            (UserRole::Marketer, _) => principal.user_id,
            (UserRole::Supervisor, None) => principal.user_id,
            (UserRole::Manager, None) => {
                return Err(AppError::invalid("ownerId", "obrigatório para MANAGER"));
            }
            (UserRole::Auditor, _) => {
                return Err(AppError::forbidden("Auditores não cadastram clientes."));
            }
            (_, Some(owner)) => owner,
        };

        self.visibility.ensure_can_write(&mut *conn, principal, owner_id).await?;
        Ok(owner_id)
    }

    // =========================================================================
    //  EDIÇÃO
    // =========================================================================

    pub async fn update_client<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        payload: UpdateClientPayload,
    ) -> Result<Client, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let UpdateClientPayload { id, patch } = payload;
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .lock_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Cliente"))?;

        // Designação de auditor só pelo fluxo de auditoria (roster, elegibilidade, aviso)
        if patch.auditor_assignee.is_some() {
            return Err(AppError::invalid(
                "auditorAssignee",
                "use /api/audit_checklist/assign ou /api/audit_checklist/unassign",
            ));
        }

        if patch.marketer_id.is_some_and(|m| m != current.marketer_id) {
            return Err(AppError::forbidden("A posse do cliente não pode ser transferida."));
        }

        match principal.role {
            UserRole::Auditor => {
                if !patch.touches_only_billing() {
                    return Err(AppError::forbidden(
                        "Auditores só podem alterar dpp e dpPaid.",
                    ));
                }
                if !current.is_audit_eligible() {
                    return Err(AppError::forbidden("Cliente não elegível para auditoria."));
                }
            }
            UserRole::Manager => {}
            UserRole::Marketer | UserRole::Supervisor => {
                self.visibility
                    .ensure_can_write(&mut *tx, principal, current.marketer_id)
                    .await?;
            }
        }

        let updated = self
            .repo
            .apply_patch(&mut *tx, id, &patch, self.clock.today())
            .await?;
        tx.commit().await?;

        if current.status != updated.status {
            tracing::info!(
                "🔀 Cliente {} mudou de {} para {}",
                id,
                current.status.as_str(),
                updated.status.as_str()
            );
        }
        Ok(updated)
    }

    // =========================================================================
    //  REMOÇÃO
    // =========================================================================

    pub async fn delete_client<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .lock_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Cliente"))?;
        self.visibility
            .ensure_can_write(&mut *tx, principal, current.marketer_id)
            .await?;

        self.repo.delete(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!("🗑️ Cliente '{}' removido por {}", current.name, principal.user_id);
        Ok(())
    }

    // =========================================================================
    //  IMPORTAÇÃO EM MASSA
    // =========================================================================

    /// Cada linha é gravada isoladamente: uma linha ruim nunca aborta as outras.
    pub async fn bulk_import<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        payload: BulkImportPayload,
    ) -> Result<ImportResult, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;

        let owner_id = self.resolve_owner(&mut *conn, principal, payload.owner_id).await?;
        let existing = self.repo.existing_names_lower(&mut *conn, owner_id).await?;
        let today = self.clock.today();

        let mut imported = Vec::new();
        let mut skipped = Vec::new();

        for planned in plan_import(&payload.rows, owner_id, &existing) {
            match planned {
                RowPlan::Skip(skip) => {
                    tracing::warn!("⏭️ Importação: linha {} ignorada ({})", skip.row, skip.reason);
                    skipped.push(skip);
                }
                RowPlan::Insert { row, client } => {
                    match self.repo.create_client(&mut *conn, &client, today).await {
                        Ok(created) => imported.push(created),
                        Err(e) => {
                            tracing::warn!("⏭️ Importação: linha {} falhou: {:?}", row, e);
                            skipped.push(SkippedRow {
                                row,
                                name: client.name.to_string(),
                                reason: "Falha ao gravar a linha".to_string(),
                            });
                        }
                    }
                }
            }
        }

        tracing::info!(
            "📥 Importação para {}: {} importados, {} ignorados",
            owner_id,
            imported.len(),
            skipped.len()
        );

        Ok(ImportResult {
            total_imported: imported.len(),
            total_skipped: skipped.len(),
            imported,
            skipped,
        })
    }
}

/// Decisão por linha da importação, antes de tocar no banco.
#[derive(Debug)]
pub enum RowPlan<'a> {
    Insert { row: usize, client: NewClient<'a> },
    Skip(SkippedRow),
}

/// Planeja a importação: nomes vazios, duplicados já cadastrados (sem diferenciar
/// maiúsculas) e duplicados dentro do próprio lote são ignorados com motivo.
pub fn plan_import<'a>(
    rows: &'a [ImportRow],
    owner_id: Uuid,
    existing_lower: &HashSet<String>,
) -> Vec<RowPlan<'a>> {
    let mut seen: HashSet<String> = HashSet::new();

    rows.iter()
        .enumerate()
        .map(|(idx, row)| {
            let row_number = idx + 1;
            let name = row.name.trim();
            let skip = |reason: String| {
                RowPlan::Skip(SkippedRow { row: row_number, name: name.to_string(), reason })
            };

            if name.is_empty() {
                return skip(format!("Linha {}: nome em branco", row_number));
            }
            let key = name.to_lowercase();
            if existing_lower.contains(&key) {
                return skip(format!("Linha {}: cliente '{}' já existe", row_number, name));
            }
            if !seen.insert(key) {
                return skip(format!("Linha {}: '{}' repetido no arquivo", row_number, name));
            }
            let estimated_value = row.estimated_value.unwrap_or(Decimal::ZERO);
            if estimated_value < Decimal::ZERO {
                return skip(format!("Linha {}: valor estimado negativo", row_number));
            }

            RowPlan::Insert {
                row: row_number,
                client: NewClient {
                    owner_id,
                    name,
                    phone: row.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()),
                    notes: row.notes.as_deref(),
                    status: row
                        .status
                        .as_deref()
                        .and_then(ClientStatus::parse_label)
                        .unwrap_or(ClientStatus::New),
                    estimated_value,
                    dpp: Decimal::ZERO,
                    dp_paid: Decimal::ZERO,
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str) -> ImportRow {
        ImportRow { name: name.into(), ..Default::default() }
    }

    fn skipped(plans: &[RowPlan<'_>]) -> Vec<usize> {
        plans
            .iter()
            .filter_map(|p| match p {
                RowPlan::Skip(s) => Some(s.row),
                RowPlan::Insert { .. } => None,
            })
            .collect()
    }

    #[test]
    fn duplicate_of_existing_client_is_skipped_case_insensitively() {
        let rows = vec![row("PT Alpha"), row("  pt beta "), row("PT Gamma")];
        let existing: HashSet<String> = ["pt beta".to_string()].into();
        let plans = plan_import(&rows, Uuid::new_v4(), &existing);

        assert_eq!(skipped(&plans), vec![2]);
        match &plans[1] {
            RowPlan::Skip(s) => assert!(s.reason.contains("Linha 2")),
            RowPlan::Insert { .. } => panic!("linha 2 deveria ser ignorada"),
        }
    }

    #[test]
    fn blank_names_and_in_batch_repeats_are_skipped() {
        let rows = vec![row("   "), row("CV Satu"), row("cv satu")];
        let plans = plan_import(&rows, Uuid::new_v4(), &HashSet::new());
        assert_eq!(skipped(&plans), vec![1, 3]);
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let owner = Uuid::new_v4();
        let rows = vec![ImportRow {
            name: "Toko Maju".into(),
            status: Some("presentasi".into()),
            ..Default::default()
        }, ImportRow {
            name: "Toko Lain".into(),
            status: Some("???".into()),
            ..Default::default()
        }];
        let plans = plan_import(&rows, owner, &HashSet::new());

        let RowPlan::Insert { client, .. } = &plans[0] else { panic!("esperava inserção") };
        assert_eq!(client.owner_id, owner);
        assert_eq!(client.status, ClientStatus::Presentasi);
        assert_eq!(client.estimated_value, Decimal::ZERO);

        let RowPlan::Insert { client, .. } = &plans[1] else { panic!("esperava inserção") };
        assert_eq!(client.status, ClientStatus::New);
    }

    #[test]
    fn negative_value_is_a_row_level_skip() {
        let rows = vec![ImportRow {
            name: "PT Minus".into(),
            estimated_value: Some(Decimal::new(-10, 0)),
            ..Default::default()
        }];
        let plans = plan_import(&rows, Uuid::new_v4(), &HashSet::new());
        assert_eq!(skipped(&plans), vec![1]);
    }
}
