// src/db/audit_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::audit::{AuditChecklistItem, AuditQueueEntry, CheckStamp, ChecklistItemKey},
};

const ITEM_COLUMNS: &str = "id, client_id, item_key, checked, checked_at, checked_by";

// Sem estado: toda consulta recebe o executor (pool, conexão ou transação)
#[derive(Clone, Default)]
pub struct AuditRepository;

impl AuditRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn count_items<'e, E>(&self, executor: E, client_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM audit_checklist_items WHERE client_id = $1",
        )
        .bind(client_id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    /// Insere os 7 itens fixos na ordem canônica. A chave única (client_id, item_key)
    /// torna a operação idempotente mesmo com chamadas concorrentes.
    pub async fn insert_fixed_items<'e, E>(&self, executor: E, client_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let keys: Vec<&str> = ChecklistItemKey::ORDERED.iter().map(|k| k.as_str()).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO audit_checklist_items (client_id, item_key)
            SELECT $1, k.key::checklist_item_key
            FROM unnest($2::text[]) WITH ORDINALITY AS k(key, ord)
            ORDER BY k.ord
            ON CONFLICT ON CONSTRAINT audit_checklist_client_item_key DO NOTHING
            "#,
        )
        .bind(client_id)
        .bind(&keys)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn list_items<'e, E>(
        &self,
        executor: E,
        client_id: Uuid,
    ) -> Result<Vec<AuditChecklistItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, AuditChecklistItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM audit_checklist_items WHERE client_id = $1 ORDER BY id"
        ))
        .bind(client_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn set_item<'e, E>(
        &self,
        executor: E,
        item_id: i64,
        stamp: &CheckStamp,
    ) -> Result<AuditChecklistItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, AuditChecklistItem>(&format!(
            r#"
            UPDATE audit_checklist_items
            SET checked = $2, checked_at = $3, checked_by = $4
            WHERE id = $1
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(item_id)
        .bind(stamp.checked)
        .bind(stamp.checked_at)
        .bind(stamp.checked_by)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::not_found("Item do checklist"))?;
        Ok(item)
    }

    /// Fila de auditoria: clientes elegíveis com o progresso do checklist.
    pub async fn queue<'e, E>(&self, executor: E) -> Result<Vec<AuditQueueEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entries = sqlx::query_as::<_, AuditQueueEntry>(
            r#"
            SELECT
                c.id AS client_id,
                c.name AS client_name,
                c.marketer_id,
                c.status,
                c.auditor_assignee,
                COUNT(i.id) FILTER (WHERE i.checked) AS checked_items,
                7::BIGINT AS total_items
            FROM clients c
            LEFT JOIN audit_checklist_items i ON i.client_id = c.id
            WHERE c.status = 'DEAL' OR c.dp_paid > 0
            GROUP BY c.id
            ORDER BY c.auditor_assignee NULLS FIRST, c.last_update ASC
            "#,
        )
        .fetch_all(executor)
        .await?;
        Ok(entries)
    }
}
