// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{is_unique_violation, AppError},
    models::auth::{User, UserRole},
};

const USER_COLUMNS: &str = r#"
    id, email, password_hash, display_name, role,
    supervisor_id, is_active, created_at, updated_at
"#;

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // Busca um usuário pelo seu e-mail (login)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_user)
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let maybe_user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(maybe_user)
    }

    pub async fn list_all<'e, E>(&self, executor: E) -> Result<Vec<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY display_name ASC"
        ))
        .fetch_all(executor)
        .await?;
        Ok(users)
    }

    pub async fn list_by_ids<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<Vec<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1) ORDER BY display_name ASC"
        ))
        .bind(ids)
        .fetch_all(executor)
        .await?;
        Ok(users)
    }

    /// IDs da equipe de um supervisor, lidos no momento da requisição (sem cache).
    pub async fn team_member_ids<'e, E>(
        &self,
        executor: E,
        supervisor_id: Uuid,
    ) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM users WHERE supervisor_id = $1 ORDER BY id",
        )
        .bind(supervisor_id)
        .fetch_all(executor)
        .await?;
        Ok(ids)
    }

    pub async fn is_supervised_by<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        supervisor_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE id = $1 AND supervisor_id = $2)",
        )
        .bind(user_id)
        .bind(supervisor_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    // Cria um novo usuário, com tratamento específico para e-mails duplicados.
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        email: &str,
        password_hash: &str,
        display_name: &str,
        role: UserRole,
        supervisor_id: Option<Uuid>,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, display_name, role, supervisor_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(password_hash)
        .bind(display_name)
        .bind(role)
        .bind(supervisor_id)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::EmailAlreadyExists;
            }
            e.into()
        })?;

        Ok(user)
    }

    // Atualização parcial. `supervisor_id`: None = mantém, Some(None) = remove.
    pub async fn update_user<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        display_name: Option<&str>,
        role: Option<UserRole>,
        supervisor_id: Option<Option<Uuid>>,
        is_active: Option<bool>,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                display_name  = COALESCE($2, display_name),
                role          = COALESCE($3, role),
                supervisor_id = CASE WHEN $4 THEN $5 ELSE supervisor_id END,
                is_active     = COALESCE($6, is_active),
                updated_at    = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(display_name)
        .bind(role)
        .bind(supervisor_id.is_some())
        .bind(supervisor_id.flatten())
        .bind(is_active)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::not_found("Usuário"))?;

        Ok(user)
    }
}
