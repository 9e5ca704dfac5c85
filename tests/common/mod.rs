// tests/common/mod.rs
//
// Suporte compartilhado pelos testes de integração. Cada teste cria os
// próprios usuários (e-mails aleatórios), então podem rodar em paralelo
// sobre o mesmo banco.

#![allow(dead_code)]

use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use salesflow_backend::{
    config::{AppState, Settings},
    db::UserRepository,
    models::{
        auth::{Principal, UserRole},
        client::{Client, ClientStatus, CreateClientPayload},
        report::{ProgressUpdateInput, SubmitReportPayload},
    },
};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

pub const AUDITOR_NAME: &str = "Budi";

fn database_url() -> Option<String> {
    dotenvy::dotenv().ok();
    std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
}

/// Estado completo da aplicação sobre o banco de teste, ou `None` (teste
/// ignorado) quando nenhuma URL está configurada.
pub async fn test_state() -> Option<AppState> {
    let Some(url) = database_url() else {
        eprintln!("⚠️ TEST_DATABASE_URL/DATABASE_URL ausente: teste de integração ignorado");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("conexão com o banco de teste");
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("migrações no banco de teste");

    let upload_dir = std::env::temp_dir().join(format!("salesflow-test-{}", Uuid::new_v4()));
    let settings = Settings {
        database_url: url,
        jwt_secret: "segredo-de-teste".into(),
        bind_addr: "127.0.0.1:0".into(),
        db_max_connections: 10,
        business_utc_offset_hours: 7,
        upload_dir: upload_dir.to_string_lossy().into_owned(),
        auditor_roster: format!("{AUDITOR_NAME}|+628111111|budi@audit.co.id"),
        whatsapp_api_url: None,
        whatsapp_api_token: None,
        email_api_url: None,
        email_api_token: None,
        email_from: "noreply@salesflow.test".into(),
        notify_timeout: Duration::from_secs(1),
    };

    Some(AppState::from_parts(pool, settings).expect("montagem do AppState"))
}

pub async fn create_user(state: &AppState, role: UserRole, supervisor: Option<Uuid>) -> Principal {
    let repo = UserRepository::new(state.db_pool.clone());
    let email = format!("{}@salesflow.test", Uuid::new_v4());
    let user = repo
        .create_user(&state.db_pool, &email, "x", "Usuário de Teste", role, supervisor)
        .await
        .expect("criação do usuário de teste");
    Principal::from(&user)
}

pub fn new_client(name: &str) -> CreateClientPayload {
    CreateClientPayload {
        owner_id: None,
        name: name.into(),
        phone: None,
        notes: None,
        status: None,
        estimated_value: None,
        dpp: None,
        dp_paid: None,
    }
}

pub async fn create_client(state: &AppState, owner: &Principal, name: &str) -> Client {
    create_client_with(state, owner, new_client(name)).await
}

pub async fn create_client_with(
    state: &AppState,
    owner: &Principal,
    payload: CreateClientPayload,
) -> Client {
    state
        .client_service
        .create_client(&state.db_pool, owner, payload)
        .await
        .expect("criação do cliente de teste")
}

/// Cliente já elegível para auditoria (DEAL).
pub async fn create_deal_client(state: &AppState, owner: &Principal, name: &str) -> Client {
    let payload = CreateClientPayload {
        status: Some(ClientStatus::Deal),
        dpp: Some(Decimal::new(10_000_000, 0)),
        ..new_client(name)
    };
    create_client_with(state, owner, payload).await
}

pub fn report(date: NaiveDate, summary: &str, updates: Vec<ProgressUpdateInput>) -> SubmitReportPayload {
    SubmitReportPayload {
        report_date: date,
        summary: summary.into(),
        new_leads: 1,
        follow_ups: 2,
        deals_today: 0,
        deal_value: Decimal::ZERO,
        constraints: None,
        support_needed: None,
        plan_tomorrow: Some("Visitar clientes".into()),
        progress_updates: updates,
        draft: false,
    }
}

pub fn progress(client: &Client, new_status: ClientStatus) -> ProgressUpdateInput {
    ProgressUpdateInput {
        client_id: client.id,
        activity: "Reunião presencial".into(),
        prev_status: client.status,
        new_status,
        result: None,
    }
}

/// Datas distantes do "hoje" real para não colidir com outros testes do mesmo dono.
pub fn day(offset: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).expect("data fixa") + chrono::Duration::days(offset as i64)
}
