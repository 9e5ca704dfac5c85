// src/db/client_repo.rs

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{is_foreign_key_violation, AppError},
    models::client::{Client, ClientPatch, ClientStatus},
    services::visibility::ScopeFilter,
};

const CLIENT_COLUMNS: &str = r#"
    id, marketer_id, name, phone, notes, status,
    estimated_value, dpp, dp_paid, auditor_assignee, last_update, created_at
"#;

// Predicado de escopo compartilhado por todas as leituras ($1, $2, $3)
pub(crate) const SCOPE_PREDICATE: &str = r#"
    ($1 OR marketer_id = ANY($2))
    AND (NOT $3 OR status = 'DEAL' OR dp_paid > 0)
"#;

/// Campos de um cliente novo, já com os padrões aplicados.
#[derive(Debug, Clone)]
pub struct NewClient<'a> {
    pub owner_id: Uuid,
    pub name: &'a str,
    pub phone: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub status: ClientStatus,
    pub estimated_value: Decimal,
    pub dpp: Decimal,
    pub dp_paid: Decimal,
}

// Sem estado: toda consulta recebe o executor (pool, conexão ou transação)
#[derive(Clone, Default)]
pub struct ClientRepository;

impl ClientRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create_client<'e, E>(
        &self,
        executor: E,
        new: &NewClient<'_>,
        today: NaiveDate,
    ) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            INSERT INTO clients (
                marketer_id, name, phone, notes, status,
                estimated_value, dpp, dp_paid, last_update
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(new.owner_id)
        .bind(new.name)
        .bind(new.phone)
        .bind(new.notes)
        .bind(new.status)
        .bind(new.estimated_value)
        .bind(new.dpp)
        .bind(new.dp_paid)
        .bind(today)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                return AppError::not_found("Dono do cliente");
            }
            e.into()
        })?;

        Ok(client)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(client)
    }

    /// Mesma busca, travando a linha até o fim da transação.
    pub async fn lock_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(client)
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        status: Option<ClientStatus>,
        id: Option<Uuid>,
    ) -> Result<Vec<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let clients = sqlx::query_as::<_, Client>(&format!(
            r#"
            SELECT {CLIENT_COLUMNS}
            FROM clients
            WHERE {SCOPE_PREDICATE}
              AND ($4::client_status IS NULL OR status = $4)
              AND ($5::uuid IS NULL OR id = $5)
            ORDER BY last_update DESC, name ASC
            "#
        ))
        .bind(scope.all)
        .bind(&scope.owner_ids)
        .bind(scope.audit_eligible_only)
        .bind(status)
        .bind(id)
        .fetch_all(executor)
        .await?;
        Ok(clients)
    }

    /// Aplica um patch parcial. `marketer_id` e `auditor_assignee` nunca são alterados aqui.
    /// Todo patch bem-sucedido renova `last_update`.
    pub async fn apply_patch<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        patch: &ClientPatch,
        today: NaiveDate,
    ) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            UPDATE clients SET
                name             = COALESCE($2, name),
                phone            = CASE WHEN $3 THEN $4 ELSE phone END,
                notes            = CASE WHEN $5 THEN $6 ELSE notes END,
                status           = COALESCE($7, status),
                estimated_value  = COALESCE($8, estimated_value),
                dpp              = COALESCE($9, dpp),
                dp_paid          = COALESCE($10, dp_paid),
                last_update      = $11
            WHERE id = $1
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.phone.is_some())
        .bind(patch.phone.clone().flatten())
        .bind(patch.notes.is_some())
        .bind(patch.notes.clone().flatten())
        .bind(patch.status)
        .bind(patch.estimated_value)
        .bind(patch.dpp)
        .bind(patch.dp_paid)
        .bind(today)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::not_found("Cliente"))?;

        Ok(client)
    }

    pub async fn set_auditor<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        auditor: Option<&str>,
        today: NaiveDate,
    ) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            UPDATE clients SET auditor_assignee = $2, last_update = $3
            WHERE id = $1
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(auditor)
        .bind(today)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::not_found("Cliente"))?;

        Ok(client)
    }

    /// Nomes já cadastrados de um dono, em minúsculas (detecção de duplicados na importação).
    pub async fn existing_names_lower<'e, E>(
        &self,
        executor: E,
        owner_id: Uuid,
    ) -> Result<HashSet<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT LOWER(TRIM(name)) FROM clients WHERE marketer_id = $1",
        )
        .bind(owner_id)
        .fetch_all(executor)
        .await?;
        Ok(names.into_iter().collect())
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
