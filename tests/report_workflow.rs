// tests/report_workflow.rs

mod common;

use chrono::NaiveDate;
use salesflow_backend::{
    common::error::AppError,
    models::{
        auth::UserRole,
        client::ClientStatus,
        report::{ReportStatus, ReviewReportPayload},
    },
    services::{client_service::ClientFilters, report_service::ReportFilters, visibility::ScopeRequest},
};

use common::{create_client, create_user, day, progress, report, test_state};

#[tokio::test]
async fn at_most_one_report_per_day_and_owner() {
    let Some(state) = test_state().await else { return };
    let marketer = create_user(&state, UserRole::Marketer, None).await;

    for summary in ["primeira versão", "segunda versão"] {
        state
            .report_service
            .submit_report(&state.db_pool, &marketer, report(day(1), summary, vec![]))
            .await
            .unwrap();
    }

    let reports = state
        .report_service
        .list_reports(
            &state.db_pool,
            &marketer,
            &ScopeRequest::default(),
            ReportFilters { date: Some(day(1)), ..Default::default() },
        )
        .await
        .unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].report.summary, "segunda versão");
    assert_eq!(reports[0].report.status, ReportStatus::Submitted);
}

#[tokio::test]
async fn resubmission_replaces_progress_updates() {
    let Some(state) = test_state().await else { return };
    let marketer = create_user(&state, UserRole::Marketer, None).await;
    let a = create_client(&state, &marketer, "PT Alfa").await;
    let b = create_client(&state, &marketer, "PT Beta").await;

    let first = report(
        day(2),
        "manhã",
        vec![progress(&a, ClientStatus::FollowUp), progress(&b, ClientStatus::FollowUp)],
    );
    state.report_service.submit_report(&state.db_pool, &marketer, first).await.unwrap();

    let second = report(day(2), "tarde", vec![progress(&a, ClientStatus::Visit)]);
    let saved = state
        .report_service
        .submit_report(&state.db_pool, &marketer, second)
        .await
        .unwrap();

    assert_eq!(saved.progress_updates.len(), 1);
    let fetched = state
        .report_service
        .get_report(&state.db_pool, &marketer, &ScopeRequest::default(), saved.report.id)
        .await
        .unwrap();
    assert_eq!(fetched.progress_updates.len(), 1);
    assert_eq!(fetched.progress_updates[0].client_id, a.id);
    assert_eq!(fetched.progress_updates[0].new_status, ClientStatus::Visit);
}

#[tokio::test]
async fn failed_cascade_leaves_no_trace() {
    let Some(state) = test_state().await else { return };
    let marketer = create_user(&state, UserRole::Marketer, None).await;
    let stranger = create_user(&state, UserRole::Marketer, None).await;
    let own = create_client(&state, &marketer, "PT Milik Sendiri").await;
    let foreign = create_client(&state, &stranger, "PT Orang Lain").await;

    let payload = report(
        day(3),
        "tentativa",
        vec![progress(&own, ClientStatus::Negosiasi), progress(&foreign, ClientStatus::Deal)],
    );
    let err = state
        .report_service
        .submit_report(&state.db_pool, &marketer, payload)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // Nem relatório, nem filhas, nem cascata no cliente próprio
    let reports = state
        .report_service
        .list_reports(
            &state.db_pool,
            &marketer,
            &ScopeRequest::default(),
            ReportFilters { date: Some(day(3)), ..Default::default() },
        )
        .await
        .unwrap();
    assert!(reports.is_empty());

    let own_after = state
        .client_service
        .list_clients(
            &state.db_pool,
            &marketer,
            &ScopeRequest::default(),
            salesflow_backend::services::client_service::ClientFilters {
                id: Some(own.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(own_after[0].client.status, ClientStatus::New);
}

#[tokio::test]
async fn draft_is_refused_once_submitted() {
    let Some(state) = test_state().await else { return };
    let marketer = create_user(&state, UserRole::Marketer, None).await;

    let mut draft = report(day(4), "rascunho", vec![]);
    draft.draft = true;
    let saved = state
        .report_service
        .save_draft(&state.db_pool, &marketer, draft.clone())
        .await
        .unwrap();
    assert_eq!(saved.report.status, ReportStatus::Draft);
    assert!(saved.report.submitted_at.is_none());

    state
        .report_service
        .submit_report(&state.db_pool, &marketer, report(day(4), "enviado", vec![]))
        .await
        .unwrap();

    let err = state
        .report_service
        .save_draft(&state.db_pool, &marketer, draft)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn draft_cannot_reference_a_foreign_client() {
    let Some(state) = test_state().await else { return };
    let marketer = create_user(&state, UserRole::Marketer, None).await;
    let stranger = create_user(&state, UserRole::Marketer, None).await;
    let foreign = create_client(&state, &stranger, "PT Rascunho Alheio").await;

    let mut draft = report(day(60), "rascunho", vec![progress(&foreign, ClientStatus::Deal)]);
    draft.draft = true;
    let err = state
        .report_service
        .save_draft(&state.db_pool, &marketer, draft)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let reports = state
        .report_service
        .list_reports(
            &state.db_pool,
            &marketer,
            &ScopeRequest::default(),
            ReportFilters { date: Some(day(60)), ..Default::default() },
        )
        .await
        .unwrap();
    assert!(reports.is_empty());
}

#[tokio::test]
async fn failure_on_third_update_undoes_the_first_two_cascades() {
    let Some(state) = test_state().await else { return };
    let marketer = create_user(&state, UserRole::Marketer, None).await;
    let stranger = create_user(&state, UserRole::Marketer, None).await;
    let first = create_client(&state, &marketer, "PT Satu").await;
    let second = create_client(&state, &marketer, "PT Dua").await;
    let foreign = create_client(&state, &stranger, "PT Tiga Alheio").await;

    let payload = report(
        day(5),
        "três atualizações",
        vec![
            progress(&first, ClientStatus::FollowUp),
            progress(&second, ClientStatus::Visit),
            progress(&foreign, ClientStatus::Deal),
        ],
    );
    let err = state
        .report_service
        .submit_report(&state.db_pool, &marketer, payload)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let reports = state
        .report_service
        .list_reports(
            &state.db_pool,
            &marketer,
            &ScopeRequest::default(),
            ReportFilters { date: Some(day(5)), ..Default::default() },
        )
        .await
        .unwrap();
    assert!(reports.is_empty());

    let mine = state
        .client_service
        .list_clients(&state.db_pool, &marketer, &ScopeRequest::default(), ClientFilters::default())
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|v| v.client.status == ClientStatus::New));
}

#[tokio::test]
async fn new_to_deal_update_leaves_one_child_row() {
    let Some(state) = test_state().await else { return };
    let marketer = create_user(&state, UserRole::Marketer, None).await;
    let client = create_client(&state, &marketer, "PT Langsung Deal").await;
    let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

    let saved = state
        .report_service
        .submit_report(
            &state.db_pool,
            &marketer,
            report(date, "fechou", vec![progress(&client, ClientStatus::Deal)]),
        )
        .await
        .unwrap();
    assert_eq!(saved.report.report_date, date);

    let fetched = state
        .report_service
        .get_report(&state.db_pool, &marketer, &ScopeRequest::default(), saved.report.id)
        .await
        .unwrap();
    assert_eq!(fetched.progress_updates.len(), 1);
    assert_eq!(fetched.progress_updates[0].prev_status, ClientStatus::New);
    assert_eq!(fetched.progress_updates[0].new_status, ClientStatus::Deal);

    let after = state
        .client_service
        .list_clients(
            &state.db_pool,
            &marketer,
            &ScopeRequest::default(),
            ClientFilters { id: Some(client.id), ..Default::default() },
        )
        .await
        .unwrap();
    assert_eq!(after[0].client.status, ClientStatus::Deal);
    assert_eq!(after[0].client.last_update, state.clock.today());
    assert!(after[0].audit_eligible);
}

#[tokio::test]
async fn submission_cascades_and_supervisor_approves() {
    let Some(state) = test_state().await else { return };
    let supervisor = create_user(&state, UserRole::Supervisor, None).await;
    let marketer = create_user(&state, UserRole::Marketer, Some(supervisor.user_id)).await;
    let outsider = create_user(&state, UserRole::Supervisor, None).await;
    let client = create_client(&state, &marketer, "CV Sinar Jaya").await;

    let today = state.clock.today();
    let submitted = state
        .report_service
        .submit_report(
            &state.db_pool,
            &marketer,
            report(today, "visita feita", vec![progress(&client, ClientStatus::Visit)]),
        )
        .await
        .unwrap();

    // Cascata: status novo e lastUpdate = hoje
    let view = state
        .client_service
        .list_clients(
            &state.db_pool,
            &supervisor,
            &ScopeRequest { team: true, owner_id: None },
            salesflow_backend::services::client_service::ClientFilters {
                id: Some(client.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].client.status, ClientStatus::Visit);
    assert_eq!(view[0].client.last_update, today);

    // Supervisor de outra equipe não revisa; o da equipe sim
    let review = |status| ReviewReportPayload {
        id: submitted.report.id,
        status,
        note: Some("Bom trabalho".into()),
    };
    let err = state
        .report_service
        .review_report(&state.db_pool, &outsider, review(ReportStatus::Approved))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let approved = state
        .report_service
        .review_report(&state.db_pool, &supervisor, review(ReportStatus::Approved))
        .await
        .unwrap();
    assert_eq!(approved.report.status, ReportStatus::Approved);
    assert_eq!(approved.report.reviewed_by, Some(supervisor.user_id));
    assert_eq!(approved.report.review_note.as_deref(), Some("Bom trabalho"));
    assert_eq!(approved.progress_updates.len(), 1);

    // Já aprovado: não volta para REVISION
    let err = state
        .report_service
        .review_report(&state.db_pool, &supervisor, review(ReportStatus::Revision))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    // O dashboard do marketer vê o EOD de hoje
    let summary = state
        .dashboard_service
        .get_summary(&state.db_pool, &marketer, &ScopeRequest::default())
        .await
        .unwrap();
    assert_eq!(summary.eod_submitted_today, Some(true));
}
