// src/db/activity_repo.rs

use chrono::{NaiveDate, NaiveTime};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{is_foreign_key_violation, AppError},
    models::activity::{Activity, ActivityStatus, ActivityType},
    services::visibility::ScopeFilter,
};

const ACTIVITY_COLUMNS: &str = r#"
    id, activity_date, marketer_id, activity_type, client_id, description,
    start_time, end_time, proof_url, latitude, longitude, status, created_at
"#;

#[derive(Debug, Clone)]
pub struct NewActivity<'a> {
    pub activity_date: NaiveDate,
    pub marketer_id: Uuid,
    pub activity_type: ActivityType,
    pub client_id: Option<Uuid>,
    pub description: &'a str,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub proof_url: Option<&'a str>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: ActivityStatus,
}

// Sem estado: toda consulta recebe o executor (pool, conexão ou transação)
#[derive(Clone, Default)]
pub struct ActivityRepository;

impl ActivityRepository {
    pub fn new() -> Self {
        Self
    }

    // Log somente-acréscimo: o dono é sempre quem cria
    pub async fn create<'e, E>(&self, executor: E, new: &NewActivity<'_>) -> Result<Activity, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let activity = sqlx::query_as::<_, Activity>(&format!(
            r#"
            INSERT INTO activities (
                activity_date, marketer_id, activity_type, client_id, description,
                start_time, end_time, proof_url, latitude, longitude, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ACTIVITY_COLUMNS}
            "#
        ))
        .bind(new.activity_date)
        .bind(new.marketer_id)
        .bind(new.activity_type)
        .bind(new.client_id)
        .bind(new.description)
        .bind(new.start_time)
        .bind(new.end_time)
        .bind(new.proof_url)
        .bind(new.latitude)
        .bind(new.longitude)
        .bind(new.status)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                return AppError::not_found("Cliente");
            }
            e.into()
        })?;

        Ok(activity)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Activity>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let activity = sqlx::query_as::<_, Activity>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(activity)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: ActivityStatus,
    ) -> Result<Activity, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let activity = sqlx::query_as::<_, Activity>(&format!(
            "UPDATE activities SET status = $2 WHERE id = $1 RETURNING {ACTIVITY_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::not_found("Atividade"))?;
        Ok(activity)
    }

    // Atividades não têm filtro de auditoria: só $1/$2 do escopo
    pub async fn list<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Activity>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let activities = sqlx::query_as::<_, Activity>(&format!(
            r#"
            SELECT {ACTIVITY_COLUMNS}
            FROM activities
            WHERE ($1 OR marketer_id = ANY($2))
              AND ($3::date IS NULL OR activity_date >= $3)
              AND ($4::date IS NULL OR activity_date <= $4)
            ORDER BY activity_date DESC, start_time DESC NULLS LAST, created_at DESC
            "#
        ))
        .bind(scope.all)
        .bind(&scope.owner_ids)
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await?;
        Ok(activities)
    }
}
