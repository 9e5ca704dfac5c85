// src/config.rs

use crate::{
    common::clock::BusinessClock,
    db::{
        ActivityRepository, AuditRepository, ClientRepository, DashboardRepository,
        ReportRepository, UserRepository,
    },
    services::{
        notification::{AuditorRoster, EmailGateway, Notifier, WhatsAppGateway},
        storage::{BlobStore, LocalBlobStore},
        visibility::VisibilityResolver,
        ActivityService, AuditService, AuthService, ClientService, DashboardService,
        ReportService, UserService,
    },
};
use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, str::FromStr, sync::Arc, time::Duration};

// Prefixo público dos arquivos servidos pelo ServeDir
pub const UPLOADS_PREFIX: &str = "/uploads";

/// Configuração lida do ambiente (`.env` incluso).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub business_utc_offset_hours: i32,
    pub upload_dir: String,
    pub auditor_roster: String,
    pub whatsapp_api_url: Option<String>,
    pub whatsapp_api_token: Option<String>,
    pub email_api_url: Option<String>,
    pub email_api_token: Option<String>,
    pub email_from: String,
    pub notify_timeout: Duration,
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{} deve ser definida", key))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} inválida: '{}'", key, raw)),
        None => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            db_max_connections: parsed("DB_MAX_CONNECTIONS", 5)?,
            business_utc_offset_hours: parsed("BUSINESS_UTC_OFFSET_HOURS", 7)?,
            upload_dir: optional("UPLOAD_DIR").unwrap_or_else(|| "./uploads".to_string()),
            auditor_roster: optional("AUDITOR_ROSTER").unwrap_or_default(),
            whatsapp_api_url: optional("WHATSAPP_API_URL"),
            whatsapp_api_token: optional("WHATSAPP_API_TOKEN"),
            email_api_url: optional("EMAIL_API_URL"),
            email_api_token: optional("EMAIL_API_TOKEN"),
            email_from: optional("EMAIL_FROM").unwrap_or_else(|| "noreply@salesflow.local".to_string()),
            notify_timeout: Duration::from_secs(parsed("NOTIFY_TIMEOUT_SECS", 5)?),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Arc<Settings>,
    pub clock: BusinessClock,
    pub blob_store: Arc<dyn BlobStore>,

    pub auth_service: AuthService,
    pub user_service: UserService,
    pub client_service: ClientService,
    pub activity_service: ActivityService,
    pub report_service: ReportService,
    pub audit_service: AuditService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let settings = Settings::from_env()?;

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        sqlx::migrate!()
            .run(&db_pool)
            .await
            .context("Falha ao rodar as migrações do banco de dados")?;

        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

        Self::from_parts(db_pool, settings)
    }

    /// Monta o gráfico de dependências sobre um pool já conectado.
    pub fn from_parts(db_pool: PgPool, settings: Settings) -> anyhow::Result<Self> {
        let clock = BusinessClock::new(settings.business_utc_offset_hours);
        let blob_store: Arc<dyn BlobStore> =
            Arc::new(LocalBlobStore::new(&settings.upload_dir, UPLOADS_PREFIX));

        let http = reqwest::Client::builder()
            .timeout(settings.notify_timeout)
            .build()
            .context("Falha ao montar o cliente HTTP")?;
        let notifier = Notifier::new(
            Arc::new(WhatsAppGateway::new(
                http.clone(),
                settings.whatsapp_api_url.clone(),
                settings.whatsapp_api_token.clone(),
            )),
            Arc::new(EmailGateway::new(
                http,
                settings.email_api_url.clone(),
                settings.email_api_token.clone(),
                settings.email_from.clone(),
            )),
            settings.notify_timeout,
        );
        let roster = AuditorRoster::from_config(&settings.auditor_roster);
        if roster.names().is_empty() {
            tracing::warn!("⚠️ AUDITOR_ROSTER vazio: nenhuma designação de auditor será aceita");
        }

        // --- Repositórios ---
        let user_repo = UserRepository::new(db_pool.clone());
        let client_repo = ClientRepository::new();
        let activity_repo = ActivityRepository::new();
        let report_repo = ReportRepository::new();
        let audit_repo = AuditRepository::new();
        let dashboard_repo = DashboardRepository::new();

        let visibility = VisibilityResolver::new(user_repo.clone());

        // --- Serviços ---
        let auth_service = AuthService::new(user_repo.clone(), settings.jwt_secret.clone());
        let user_service = UserService::new(user_repo);
        let client_service = ClientService::new(client_repo.clone(), visibility.clone(), clock);
        let activity_service = ActivityService::new(
            activity_repo,
            client_repo.clone(),
            visibility.clone(),
            blob_store.clone(),
            clock,
        );
        let report_service = ReportService::new(
            report_repo.clone(),
            client_repo.clone(),
            visibility.clone(),
            clock,
        );
        let audit_service = AuditService::new(audit_repo, client_repo.clone(), roster, notifier, clock);
        let dashboard_service =
            DashboardService::new(dashboard_repo, client_repo, report_repo, visibility, clock);

        Ok(Self {
            db_pool,
            settings: Arc::new(settings),
            clock,
            blob_store,
            auth_service,
            user_service,
            client_service,
            activity_service,
            report_service,
            audit_service,
            dashboard_service,
        })
    }
}
