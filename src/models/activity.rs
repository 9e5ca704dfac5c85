// src/models/activity.rs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "activity_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    ChatDm,
    Call,
    Visit,
    Meeting,
    Posting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "activity_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityStatus {
    Done,
    Pending,
    Cancel,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    pub activity_date: NaiveDate,
    pub marketer_id: Uuid,
    pub activity_type: ActivityType,
    // Referência fraca: vira NULL se o cliente for removido
    pub client_id: Option<Uuid>,
    pub description: String,
    #[schema(value_type = Option<String>, example = "09:30:00")]
    pub start_time: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "10:15:00")]
    pub end_time: Option<NaiveTime>,
    pub proof_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: ActivityStatus,
    pub created_at: DateTime<Utc>,
}

fn validate_time_range(payload: &CreateActivityPayload) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (payload.start_time, payload.end_time) {
        if end < start {
            let mut err = ValidationError::new("time_range");
            err.message = Some("O horário final não pode ser anterior ao inicial.".into());
            return Err(err);
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_time_range", skip_on_field_errors = false))]
pub struct CreateActivityPayload {
    // Ausente = hoje (fuso do negócio)
    pub activity_date: Option<NaiveDate>,
    pub activity_type: ActivityType,
    pub client_id: Option<Uuid>,
    #[validate(length(min = 1, max = 2000, message = "A descrição é obrigatória."))]
    pub description: String,
    #[schema(value_type = Option<String>)]
    pub start_time: Option<NaiveTime>,
    #[schema(value_type = Option<String>)]
    pub end_time: Option<NaiveTime>,
    pub proof_url: Option<String>,
    pub status: Option<ActivityStatus>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateActivityStatusPayload {
    pub id: Uuid,
    pub status: ActivityStatus,
}

/// Dados de um check-in já extraídos do multipart.
#[derive(Debug, Clone)]
pub struct CheckIn {
    pub latitude: f64,
    pub longitude: f64,
    pub client_id: Option<Uuid>,
    pub note: Option<String>,
    pub photo: Vec<u8>,
    pub photo_extension: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(start: Option<&str>, end: Option<&str>) -> CreateActivityPayload {
        CreateActivityPayload {
            activity_date: None,
            activity_type: ActivityType::Call,
            client_id: None,
            description: "Ligação de follow up".into(),
            start_time: start.map(|s| NaiveTime::parse_from_str(s, "%H:%M").unwrap()),
            end_time: end.map(|s| NaiveTime::parse_from_str(s, "%H:%M").unwrap()),
            proof_url: None,
            status: None,
        }
    }

    #[test]
    fn end_before_start_is_rejected() {
        assert!(payload(Some("10:00"), Some("09:00")).validate().is_err());
        assert!(payload(Some("09:00"), Some("10:00")).validate().is_ok());
        assert!(payload(None, Some("10:00")).validate().is_ok());
    }

    #[test]
    fn activity_type_uses_screaming_snake_case() {
        let t: ActivityType = serde_json::from_str("\"CHAT_DM\"").unwrap();
        assert_eq!(t, ActivityType::ChatDm);
    }
}
