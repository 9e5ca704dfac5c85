// src/models/client.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Dias sem atualização a partir dos quais um cliente aberto é considerado parado.
pub const STAGNATION_THRESHOLD_DAYS: i64 = 7;

// --- ENUMS ---

// Mapeia o CREATE TYPE client_status do banco.
// A ordem das variantes é a ordem do funil; não há transições proibidas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "client_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientStatus {
    New,
    FollowUp,
    Visit,
    Presentasi,
    Penawaran,
    Negosiasi,
    Deal,
    Lost,
    Maintenance,
}

impl ClientStatus {
    pub const ALL: [ClientStatus; 9] = [
        ClientStatus::New,
        ClientStatus::FollowUp,
        ClientStatus::Visit,
        ClientStatus::Presentasi,
        ClientStatus::Penawaran,
        ClientStatus::Negosiasi,
        ClientStatus::Deal,
        ClientStatus::Lost,
        ClientStatus::Maintenance,
    ];

    /// DEAL e LOST encerram o funil: nunca contam como parados.
    pub fn is_closed(self) -> bool {
        matches!(self, ClientStatus::Deal | ClientStatus::Lost)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClientStatus::New => "NEW",
            ClientStatus::FollowUp => "FOLLOW_UP",
            ClientStatus::Visit => "VISIT",
            ClientStatus::Presentasi => "PRESENTASI",
            ClientStatus::Penawaran => "PENAWARAN",
            ClientStatus::Negosiasi => "NEGOSIASI",
            ClientStatus::Deal => "DEAL",
            ClientStatus::Lost => "LOST",
            ClientStatus::Maintenance => "MAINTENANCE",
        }
    }

    /// Aceita o rótulo do banco e variações comuns de planilha ("follow up", "deal").
    pub fn parse_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_uppercase().replace([' ', '-'], "_");
        ClientStatus::ALL.into_iter().find(|s| s.as_str() == normalized)
    }
}

// --- CLIENTE ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub marketer_id: Uuid,

    #[schema(example = "PT Sinar Jaya")]
    pub name: String,
    pub phone: Option<String>,
    pub notes: Option<String>,

    pub status: ClientStatus,

    #[schema(example = "15000000.00")]
    pub estimated_value: Decimal,
    // Par de faturamento: valor do contrato e quanto já foi pago
    pub dpp: Decimal,
    pub dp_paid: Decimal,

    #[schema(example = "Budi")]
    pub auditor_assignee: Option<String>,

    pub last_update: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Client {
    /// Elegível para auditoria: negócio fechado ou qualquer pagamento registrado.
    pub fn is_audit_eligible(&self) -> bool {
        audit_eligible(self.status, self.dp_paid)
    }

    pub fn days_stagnant(&self, today: NaiveDate) -> i64 {
        (today - self.last_update).num_days()
    }

    pub fn is_stagnant(&self, today: NaiveDate) -> bool {
        !self.status.is_closed() && self.days_stagnant(today) > STAGNATION_THRESHOLD_DAYS
    }
}

pub fn audit_eligible(status: ClientStatus, dp_paid: Decimal) -> bool {
    status == ClientStatus::Deal || dp_paid > Decimal::ZERO
}

/// Visão derivada de um cliente. Calculada na leitura, nunca persistida.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientView {
    #[serde(flatten)]
    pub client: Client,
    pub days_stagnant: i64,
    pub stagnant: bool,
    pub audit_eligible: bool,
}

impl ClientView {
    pub fn derive(client: Client, today: NaiveDate) -> Self {
        let days_stagnant = client.days_stagnant(today);
        let stagnant = client.is_stagnant(today);
        let audit_eligible = client.is_audit_eligible();
        Self { client, days_stagnant, stagnant, audit_eligible }
    }
}

/// computeStagnant: projeta a lista de clientes com os campos de estagnação.
pub fn compute_stagnant(clients: Vec<Client>, today: NaiveDate) -> Vec<ClientView> {
    clients
        .into_iter()
        .map(|c| ClientView::derive(c, today))
        .collect()
}

// --- PAYLOADS ---

pub(crate) fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = ValidationError::new("range");
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientPayload {
    // Ignorado para MARKETER; para os demais precisa estar no escopo de escrita
    pub owner_id: Option<Uuid>,

    #[validate(length(min = 1, max = 200, message = "O nome é obrigatório."))]
    pub name: String,
    pub phone: Option<String>,
    pub notes: Option<String>,

    // Sem validação de transição na criação: qualquer status inicial é aceito
    pub status: Option<ClientStatus>,

    #[validate(custom(function = "validate_not_negative"))]
    pub estimated_value: Option<Decimal>,
    #[validate(custom(function = "validate_not_negative"))]
    pub dpp: Option<Decimal>,
    #[validate(custom(function = "validate_not_negative"))]
    pub dp_paid: Option<Decimal>,
}

// PUT /clients: documento com `id` + qualquer subconjunto de campos
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientPatch {
    #[validate(length(min = 1, max = 200, message = "O nome é obrigatório."))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::models::double_option::deserialize")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::models::double_option::deserialize")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
    pub status: Option<ClientStatus>,
    #[validate(custom(function = "validate_not_negative"))]
    pub estimated_value: Option<Decimal>,
    #[validate(custom(function = "validate_not_negative"))]
    pub dpp: Option<Decimal>,
    #[validate(custom(function = "validate_not_negative"))]
    pub dp_paid: Option<Decimal>,
    #[serde(default, deserialize_with = "crate::models::double_option::deserialize")]
    #[schema(value_type = Option<String>)]
    // Recusado com 400: a designação passa por /audit_checklist/assign
    pub auditor_assignee: Option<Option<String>>,
    // Nunca aplicado: a posse não é transferível por patch
    pub marketer_id: Option<Uuid>,
}

impl ClientPatch {
    pub fn status_only(status: ClientStatus) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    /// Campos que um AUDITOR pode tocar.
    pub fn touches_only_billing(&self) -> bool {
        self.name.is_none()
            && self.phone.is_none()
            && self.notes.is_none()
            && self.status.is_none()
            && self.estimated_value.is_none()
            && self.marketer_id.is_none()
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientPayload {
    pub id: Uuid,
    #[serde(flatten)]
    #[validate(nested)]
    pub patch: ClientPatch,
}

// --- IMPORTAÇÃO EM MASSA ---

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportRow {
    #[serde(default)]
    pub name: String,
    pub phone: Option<String>,
    pub notes: Option<String>,
    // Texto livre vindo da planilha; inválido cai em NEW
    pub status: Option<String>,
    pub estimated_value: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportPayload {
    pub owner_id: Option<Uuid>,
    pub rows: Vec<ImportRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRow {
    // Numeração a partir de 1, como na planilha
    pub row: usize,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub imported: Vec<Client>,
    pub skipped: Vec<SkippedRow>,
    pub total_imported: usize,
    pub total_skipped: usize,
}
