// src/lib.rs

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::{
    config::{AppState, UPLOADS_PREFIX},
    docs::ApiDoc,
    middleware::auth::auth_guard,
};

// Fotos de check-in passam do limite padrão de 2 MB do axum
const UPLOAD_BODY_LIMIT: usize = 10 * 1024 * 1024;

pub fn build_router(app_state: AppState) -> Router {
    // Rotas públicas
    let auth_routes = Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout));

    // Todo o resto exige sessão válida
    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::auth::get_me))
        .route(
            "/users",
            get(handlers::users::list_users)
                .post(handlers::users::create_user)
                .put(handlers::users::update_user),
        )
        .route(
            "/clients",
            get(handlers::clients::list_clients)
                .post(handlers::clients::create_client)
                .put(handlers::clients::update_client)
                .patch(handlers::clients::bulk_import)
                .delete(handlers::clients::delete_client),
        )
        .route(
            "/activities",
            get(handlers::activities::list_activities)
                .post(handlers::activities::create_activity)
                .put(handlers::activities::update_activity_status),
        )
        .route(
            "/activities/checkin",
            post(handlers::activities::check_in).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/reports",
            get(handlers::reports::list_reports)
                .post(handlers::reports::submit_report)
                .put(handlers::reports::review_report),
        )
        .route(
            "/audit_checklist",
            get(handlers::audit::get_checklist).put(handlers::audit::toggle_item),
        )
        .route("/audit_checklist/assign", post(handlers::audit::assign_auditor))
        .route("/audit_checklist/unassign", post(handlers::audit::unassign_auditor))
        .route("/dashboard", get(handlers::dashboard::get_summary))
        .route("/analytics", get(handlers::dashboard::get_analytics))
        .route(
            "/uploads",
            post(handlers::uploads::upload_file).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let api_routes = Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/auth", auth_routes)
        .merge(protected_routes);

    Router::new()
        .nest("/api", api_routes)
        .nest_service(UPLOADS_PREFIX, ServeDir::new(&app_state.settings.upload_dir))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
