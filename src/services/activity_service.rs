// src/services/activity_service.rs

use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::{Acquire, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::{clock::BusinessClock, error::AppError},
    db::{activity_repo::NewActivity, ActivityRepository, ClientRepository},
    models::{
        activity::{Activity, ActivityStatus, ActivityType, CheckIn, CreateActivityPayload},
        auth::{Principal, UserRole},
    },
    services::{
        storage::BlobStore,
        visibility::{ScopeRequest, VisibilityResolver},
    },
};

#[derive(Clone)]
pub struct ActivityService {
    repo: ActivityRepository,
    client_repo: ClientRepository,
    visibility: VisibilityResolver,
    blobs: Arc<dyn BlobStore>,
    clock: BusinessClock,
}

impl ActivityService {
    pub fn new(
        repo: ActivityRepository,
        client_repo: ClientRepository,
        visibility: VisibilityResolver,
        blobs: Arc<dyn BlobStore>,
        clock: BusinessClock,
    ) -> Self {
        Self { repo, client_repo, visibility, blobs, clock }
    }

    pub async fn create_activity<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        payload: CreateActivityPayload,
    ) -> Result<Activity, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        ensure_can_log(principal)?;
        let mut conn = executor.acquire().await?;

        if let Some(client_id) = payload.client_id {
            self.ensure_client_writable(&mut *conn, principal, client_id).await?;
        }

        let new = NewActivity {
            activity_date: payload.activity_date.unwrap_or_else(|| self.clock.today()),
            marketer_id: principal.user_id,
            activity_type: payload.activity_type,
            client_id: payload.client_id,
            description: payload.description.trim(),
            start_time: payload.start_time,
            end_time: payload.end_time,
            proof_url: payload.proof_url.as_deref(),
            latitude: None,
            longitude: None,
            status: payload.status.unwrap_or(ActivityStatus::Done),
        };
        self.repo.create(&mut *conn, &new).await
    }

    /// Só o dono muda o status de uma atividade.
    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        id: Uuid,
        status: ActivityStatus,
    ) -> Result<Activity, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;

        let activity = self
            .repo
            .find_by_id(&mut *conn, id)
            .await?
            .ok_or_else(|| AppError::not_found("Atividade"))?;
        if activity.marketer_id != principal.user_id {
            return Err(AppError::forbidden("Somente o dono altera a atividade."));
        }

        self.repo.update_status(&mut *conn, id, status).await
    }

    /// Check-in de campo: grava a foto e registra uma VISIT concluída
    /// com as coordenadas e a URL da prova.
    pub async fn check_in<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        check_in: CheckIn,
    ) -> Result<Activity, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        ensure_can_log(principal)?;
        validate_coordinates(check_in.latitude, check_in.longitude)?;
        if check_in.photo.is_empty() {
            return Err(AppError::invalid("photo", "a foto é obrigatória"));
        }

        let mut conn = executor.acquire().await?;
        if let Some(client_id) = check_in.client_id {
            self.ensure_client_writable(&mut *conn, principal, client_id).await?;
        }

        let proof_url = self.blobs.put(&check_in.photo, &check_in.photo_extension).await?;

        let description = check_in
            .note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Check-in");
        let now = self.clock.now();

        let new = NewActivity {
            activity_date: self.clock.date_of(now),
            marketer_id: principal.user_id,
            activity_type: ActivityType::Visit,
            client_id: check_in.client_id,
            description,
            start_time: Some(self.clock.time_of(now)),
            end_time: None,
            proof_url: Some(proof_url.as_str()),
            latitude: Some(check_in.latitude),
            longitude: Some(check_in.longitude),
            status: ActivityStatus::Done,
        };
        let activity = self.repo.create(&mut *conn, &new).await?;

        tracing::info!(
            "📍 Check-in de {} em ({:.5}, {:.5})",
            principal.user_id,
            check_in.latitude,
            check_in.longitude
        );
        Ok(activity)
    }

    pub async fn list_activities<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        request: &ScopeRequest,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Activity>, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;
        let scope = self.visibility.resolve_scope(&mut *conn, principal, request).await?;
        self.repo.list(&mut *conn, &scope.owner_filter()?, from, to).await
    }

    async fn ensure_client_writable(
        &self,
        conn: &mut PgConnection,
        principal: &Principal,
        client_id: Uuid,
    ) -> Result<(), AppError> {
        let client = self
            .client_repo
            .find_by_id(&mut *conn, client_id)
            .await?
            .ok_or_else(|| AppError::not_found("Cliente"))?;
        self.visibility
            .ensure_can_write(&mut *conn, principal, client.marketer_id)
            .await
    }
}

// AUDITOR não registra atividades
fn ensure_can_log(principal: &Principal) -> Result<(), AppError> {
    if principal.role == UserRole::Auditor {
        return Err(AppError::forbidden("Auditores não registram atividades."));
    }
    Ok(())
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), AppError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::invalid("latitude", "fora do intervalo [-90, 90]"));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::invalid("longitude", "fora do intervalo [-180, 180]"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_are_range_checked() {
        assert!(validate_coordinates(-6.2, 106.8).is_ok());
        assert!(validate_coordinates(91.0, 0.0).is_err());
        let err = validate_coordinates(0.0, -181.0).unwrap_err();
        assert!(err.to_string().contains("longitude"));
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn auditors_cannot_log_activities() {
        let id = Uuid::new_v4();
        assert!(ensure_can_log(&Principal::new(id, UserRole::Auditor)).is_err());
        assert!(ensure_can_log(&Principal::new(id, UserRole::Manager)).is_ok());
    }
}
