// src/handlers/activities.rs

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::uploads::{multipart_error, read_file, UploadedFile},
    models::{
        activity::{Activity, CheckIn, CreateActivityPayload, UpdateActivityStatusPayload},
        auth::Principal,
    },
    services::visibility::ScopeRequest,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListActivitiesQuery {
    pub scope: Option<String>,
    pub owner_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// GET /api/activities
#[utoipa::path(
    get,
    path = "/api/activities",
    tag = "Activities",
    params(ListActivitiesQuery),
    responses(
        (status = 200, description = "Atividades no escopo", body = Vec<Activity>),
        (status = 403, description = "AUDITOR não lê atividades")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn list_activities(
    State(app_state): State<AppState>,
    principal: Principal,
    Query(query): Query<ListActivitiesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let request = ScopeRequest::from_parts(query.scope.as_deref(), query.owner_id);

    let activities = app_state
        .activity_service
        .list_activities(&app_state.db_pool, &principal, &request, query.from, query.to)
        .await?;

    Ok(Json(activities))
}

// POST /api/activities
#[utoipa::path(
    post,
    path = "/api/activities",
    tag = "Activities",
    request_body = CreateActivityPayload,
    responses(
        (status = 201, description = "Atividade registrada", body = Activity),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Cliente fora do escopo de escrita")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn create_activity(
    State(app_state): State<AppState>,
    principal: Principal,
    Json(payload): Json<CreateActivityPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let activity = app_state
        .activity_service
        .create_activity(&app_state.db_pool, &principal, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(activity)))
}

// PUT /api/activities
#[utoipa::path(
    put,
    path = "/api/activities",
    tag = "Activities",
    request_body = UpdateActivityStatusPayload,
    responses(
        (status = 200, description = "Status atualizado", body = Activity),
        (status = 403, description = "Somente o dono altera a atividade"),
        (status = 404, description = "Atividade não encontrada")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn update_activity_status(
    State(app_state): State<AppState>,
    principal: Principal,
    Json(payload): Json<UpdateActivityStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let activity = app_state
        .activity_service
        .update_status(&app_state.db_pool, &principal, payload.id, payload.status)
        .await?;

    Ok(Json(activity))
}

#[derive(Debug, ToSchema)]
pub struct CheckInForm {
    pub latitude: f64,
    pub longitude: f64,
    pub client_id: Option<Uuid>,
    pub note: Option<String>,
    #[schema(value_type = String, format = Binary)]
    pub photo: Vec<u8>,
}

fn parse_coordinate(field: &str, raw: &str) -> Result<f64, AppError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| AppError::invalid(field, "deve ser um número"))
}

// Os campos de texto chegam como strings; vazios contam como ausentes
fn parse_check_in(
    latitude: Option<String>,
    longitude: Option<String>,
    client_id: Option<String>,
    note: Option<String>,
    photo: Option<UploadedFile>,
) -> Result<CheckIn, AppError> {
    let latitude = latitude
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::invalid("latitude", "obrigatório"))?;
    let longitude = longitude
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::invalid("longitude", "obrigatório"))?;
    let client_id = match client_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            Uuid::parse_str(raw).map_err(|_| AppError::invalid("client_id", "UUID inválido"))?,
        ),
    };
    let photo = photo.ok_or_else(|| AppError::invalid("photo", "a foto é obrigatória"))?;

    Ok(CheckIn {
        latitude: parse_coordinate("latitude", &latitude)?,
        longitude: parse_coordinate("longitude", &longitude)?,
        client_id,
        note: note.filter(|n| !n.trim().is_empty()),
        photo: photo.bytes,
        photo_extension: photo.extension,
    })
}

// POST /api/activities/checkin
#[utoipa::path(
    post,
    path = "/api/activities/checkin",
    tag = "Activities",
    request_body(content = CheckInForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Visita registrada com foto e coordenadas", body = Activity),
        (status = 400, description = "Coordenadas ou foto ausentes"),
        (status = 403, description = "Cliente fora do escopo de escrita")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn check_in(
    State(app_state): State<AppState>,
    principal: Principal,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (mut latitude, mut longitude, mut client_id, mut note, mut photo) =
        (None, None, None, None, None);

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "photo" => photo = Some(read_file(field).await?),
            "latitude" => latitude = Some(field.text().await.map_err(multipart_error)?),
            "longitude" => longitude = Some(field.text().await.map_err(multipart_error)?),
            "client_id" | "clientId" => {
                client_id = Some(field.text().await.map_err(multipart_error)?)
            }
            "note" => note = Some(field.text().await.map_err(multipart_error)?),
            _ => {}
        }
    }

    let check_in = parse_check_in(latitude, longitude, client_id, note, photo)?;

    let activity = app_state
        .activity_service
        .check_in(&app_state.db_pool, &principal, check_in)
        .await?;

    Ok((StatusCode::CREATED, Json(activity)))
}
