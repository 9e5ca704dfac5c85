// src/services/user_service.rs

use sqlx::{Acquire, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{CreateUserPayload, Principal, UpdateUserPayload, User, UserRole},
    services::auth::hash_password,
};

#[derive(Clone)]
pub struct UserService {
    repo: UserRepository,
}

impl UserService {
    pub fn new(repo: UserRepository) -> Self {
        Self { repo }
    }

    pub async fn get_me<'e, E>(&self, executor: E, principal: &Principal) -> Result<User, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;
        self.repo
            .find_by_id(&mut *conn, principal.user_id)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    /// MANAGER vê todos; SUPERVISOR vê a si e à equipe; os demais, só a si.
    pub async fn list_users<'e, E>(&self, executor: E, principal: &Principal) -> Result<Vec<User>, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;
        match principal.role {
            UserRole::Manager => self.repo.list_all(&mut *conn).await,
            UserRole::Supervisor => {
                let mut ids = self.repo.team_member_ids(&mut *conn, principal.user_id).await?;
                ids.push(principal.user_id);
                self.repo.list_by_ids(&mut *conn, &ids).await
            }
            UserRole::Marketer | UserRole::Auditor => {
                self.repo.list_by_ids(&mut *conn, &[principal.user_id]).await
            }
        }
    }

    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        payload: CreateUserPayload,
    ) -> Result<User, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        ensure_manager(principal)?;
        let mut conn = executor.acquire().await?;

        if let Some(supervisor_id) = payload.supervisor_id {
            self.ensure_supervisor(&mut *conn, supervisor_id).await?;
        }

        let password_hash = hash_password(&payload.password).await?;
        let user = self
            .repo
            .create_user(
                &mut *conn,
                payload.email.trim(),
                &password_hash,
                payload.display_name.trim(),
                payload.role,
                payload.supervisor_id,
            )
            .await?;

        tracing::info!("👤 Usuário {} criado ({:?})", user.email, user.role);
        Ok(user)
    }

    pub async fn update_user<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        payload: UpdateUserPayload,
    ) -> Result<User, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        ensure_manager(principal)?;
        let mut tx = executor.begin().await?;

        if let Some(Some(supervisor_id)) = payload.supervisor_id {
            if supervisor_id == payload.id {
                return Err(AppError::invalid("supervisorId", "um usuário não supervisiona a si mesmo"));
            }
            self.ensure_supervisor(&mut *tx, supervisor_id).await?;
        }

        let user = self
            .repo
            .update_user(
                &mut *tx,
                payload.id,
                payload.display_name.as_deref().map(str::trim),
                payload.role,
                payload.supervisor_id,
                payload.is_active,
            )
            .await?;
        tx.commit().await?;

        if payload.is_active == Some(false) {
            tracing::info!("🚫 Usuário {} desativado", user.email);
        }
        Ok(user)
    }

    async fn ensure_supervisor(&self, conn: &mut PgConnection, supervisor_id: Uuid) -> Result<(), AppError> {
        let supervisor = self
            .repo
            .find_by_id(&mut *conn, supervisor_id)
            .await?
            .ok_or_else(|| AppError::not_found("Supervisor"))?;
        if supervisor.role != UserRole::Supervisor {
            return Err(AppError::invalid("supervisorId", "o usuário indicado não é SUPERVISOR"));
        }
        Ok(())
    }
}

fn ensure_manager(principal: &Principal) -> Result<(), AppError> {
    if principal.role == UserRole::Manager {
        Ok(())
    } else {
        Err(AppError::forbidden("Somente MANAGER gerencia usuários."))
    }
}
