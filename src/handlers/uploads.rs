// src/handlers/uploads.rs

use axum::{
    extract::{
        multipart::{Field, MultipartError},
        Multipart, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::Principal,
    services::storage::extension_of,
};

/// Arquivo extraído de um campo multipart.
pub struct UploadedFile {
    pub bytes: Vec<u8>,
    pub extension: String,
}

pub fn multipart_error(e: MultipartError) -> AppError {
    AppError::InvalidInput(format!("Formulário multipart inválido: {}", e.body_text()))
}

// Extensão pelo nome do arquivo; sem nome, pelo content-type (`image/png` → `png`)
pub async fn read_file(field: Field<'_>) -> Result<UploadedFile, AppError> {
    let extension = extension_of(field.file_name())
        .or_else(|| {
            field
                .content_type()
                .and_then(|ct| ct.split_once('/'))
                .map(|(_, subtype)| subtype.to_string())
        })
        .ok_or_else(|| AppError::invalid("file", "tipo de arquivo desconhecido"))?;

    let bytes = field.bytes().await.map_err(multipart_error)?;
    Ok(UploadedFile { bytes: bytes.to_vec(), extension })
}

#[derive(Debug, ToSchema)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    #[schema(example = "/uploads/0b6f0c1e-4f1e-4a57-9a1b-3c2d1e0f9a8b.jpg")]
    pub url: String,
}

// POST /api/uploads
#[utoipa::path(
    post,
    path = "/api/uploads",
    tag = "Uploads",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Arquivo salvo", body = UploadResponse),
        (status = 400, description = "Arquivo ausente, vazio ou de tipo não suportado")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn upload_file(
    State(app_state): State<AppState>,
    principal: Principal,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("file") {
            upload = Some(read_file(field).await?);
        }
    }
    let upload = upload.ok_or_else(|| AppError::invalid("file", "arquivo obrigatório"))?;

    let url = app_state.blob_store.put(&upload.bytes, &upload.extension).await?;
    tracing::info!("📤 Upload de {} por {}", url, principal.user_id);

    Ok((StatusCode::CREATED, Json(UploadResponse { url })))
}
