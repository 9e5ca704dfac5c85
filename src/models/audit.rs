// src/models/audit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::client::{Client, ClientStatus};

// Os 7 itens fixos do checklist de auditoria, na ordem de criação
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "checklist_item_key", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChecklistItemKey {
    DocumentCompleteness,
    PaymentVerification,
    BookkeepingEntry,
    AssignmentLetter,
    WorkInProgress,
    ResultReview,
    Delivered,
}

impl ChecklistItemKey {
    pub const ORDERED: [ChecklistItemKey; 7] = [
        ChecklistItemKey::DocumentCompleteness,
        ChecklistItemKey::PaymentVerification,
        ChecklistItemKey::BookkeepingEntry,
        ChecklistItemKey::AssignmentLetter,
        ChecklistItemKey::WorkInProgress,
        ChecklistItemKey::ResultReview,
        ChecklistItemKey::Delivered,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChecklistItemKey::DocumentCompleteness => "DOCUMENT_COMPLETENESS",
            ChecklistItemKey::PaymentVerification => "PAYMENT_VERIFICATION",
            ChecklistItemKey::BookkeepingEntry => "BOOKKEEPING_ENTRY",
            ChecklistItemKey::AssignmentLetter => "ASSIGNMENT_LETTER",
            ChecklistItemKey::WorkInProgress => "WORK_IN_PROGRESS",
            ChecklistItemKey::ResultReview => "RESULT_REVIEW",
            ChecklistItemKey::Delivered => "DELIVERED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditChecklistItem {
    pub id: i64,
    pub client_id: Uuid,
    pub item_key: ChecklistItemKey,
    pub checked: bool,
    pub checked_at: Option<DateTime<Utc>>,
    pub checked_by: Option<Uuid>,
}

/// Carimbo aplicado ao marcar/desmarcar um item.
/// Desmarcar limpa os dois campos; não há histórico.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckStamp {
    pub checked: bool,
    pub checked_at: Option<DateTime<Utc>>,
    pub checked_by: Option<Uuid>,
}

impl CheckStamp {
    pub fn for_toggle(checked: bool, actor: Uuid, now: DateTime<Utc>) -> Self {
        if checked {
            Self { checked, checked_at: Some(now), checked_by: Some(actor) }
        } else {
            Self { checked, checked_at: None, checked_by: None }
        }
    }
}

// Linha da fila de auditoria (cliente elegível + progresso)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditQueueEntry {
    pub client_id: Uuid,
    pub client_name: String,
    pub marketer_id: Uuid,
    pub status: ClientStatus,
    pub auditor_assignee: Option<String>,
    pub checked_items: i64,
    pub total_items: i64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToggleChecklistPayload {
    pub item_id: i64,
    pub checked: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignAuditorPayload {
    pub client_id: Uuid,
    #[schema(example = "Budi")]
    pub auditor_name: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnassignAuditorPayload {
    pub client_id: Uuid,
}

// Resultado de um canal de notificação: nunca lança, só informa
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChannelResult {
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ChannelResult {
    pub fn sent() -> Self {
        Self { sent: true, reason: None }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self { sent: false, reason: Some(reason.into()) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationReport {
    pub whatsapp: ChannelResult,
    pub email: ChannelResult,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentOutcome {
    pub client: Client,
    pub notification: NotificationReport,
}
