// tests/visibility.rs

mod common;

use rust_decimal::Decimal;
use salesflow_backend::{
    common::error::AppError,
    models::{
        auth::UserRole,
        client::{ClientPatch, UpdateClientPayload},
    },
    services::{client_service::ClientFilters, visibility::ScopeRequest},
};

use common::{create_client, create_deal_client, create_user, test_state};

fn only(id: uuid::Uuid) -> ClientFilters {
    ClientFilters { id: Some(id), ..Default::default() }
}

#[tokio::test]
async fn marketer_cannot_widen_scope_with_owner_id() {
    let Some(state) = test_state().await else { return };
    let marketer = create_user(&state, UserRole::Marketer, None).await;
    let other = create_user(&state, UserRole::Marketer, None).await;
    let own = create_client(&state, &marketer, "PT Punya Saya").await;
    create_client(&state, &other, "PT Punya Orang").await;

    let request = ScopeRequest { team: true, owner_id: Some(other.user_id) };
    let visible = state
        .client_service
        .list_clients(&state.db_pool, &marketer, &request, ClientFilters::default())
        .await
        .unwrap();

    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].client.id, own.id);
}

#[tokio::test]
async fn supervisor_sees_team_only_when_asked() {
    let Some(state) = test_state().await else { return };
    let supervisor = create_user(&state, UserRole::Supervisor, None).await;
    let member = create_user(&state, UserRole::Marketer, Some(supervisor.user_id)).await;
    let outsider = create_user(&state, UserRole::Marketer, None).await;
    let own = create_client(&state, &supervisor, "PT Supervisor").await;
    let team = create_client(&state, &member, "PT Tim").await;
    let foreign = create_client(&state, &outsider, "PT Luar").await;

    let list = |request: ScopeRequest| {
        let state = state.clone();
        async move {
            state
                .client_service
                .list_clients(&state.db_pool, &supervisor, &request, ClientFilters::default())
                .await
                .unwrap()
                .into_iter()
                .map(|v| v.client.id)
                .collect::<Vec<_>>()
        }
    };

    let personal = list(ScopeRequest::default()).await;
    assert_eq!(personal, vec![own.id]);

    let team_view = list(ScopeRequest { team: true, owner_id: None }).await;
    assert!(team_view.contains(&own.id));
    assert!(team_view.contains(&team.id));
    assert!(!team_view.contains(&foreign.id));

    // Estreitar para alguém fora da equipe é ignorado
    let clamped = list(ScopeRequest { team: true, owner_id: Some(outsider.user_id) }).await;
    assert!(!clamped.contains(&foreign.id));

    let narrowed = list(ScopeRequest { team: true, owner_id: Some(member.user_id) }).await;
    assert_eq!(narrowed, vec![team.id]);
}

#[tokio::test]
async fn auditor_sees_only_audit_eligible_clients() {
    let Some(state) = test_state().await else { return };
    let marketer = create_user(&state, UserRole::Marketer, None).await;
    let auditor = create_user(&state, UserRole::Auditor, None).await;
    let open = create_client(&state, &marketer, "PT Masih Buka").await;
    let deal = create_deal_client(&state, &marketer, "PT Sudah Deal").await;

    let request = ScopeRequest::default();
    let hidden = state
        .client_service
        .list_clients(&state.db_pool, &auditor, &request, only(open.id))
        .await
        .unwrap();
    assert!(hidden.is_empty());

    let shown = state
        .client_service
        .list_clients(&state.db_pool, &auditor, &request, only(deal.id))
        .await
        .unwrap();
    assert_eq!(shown.len(), 1);
    assert!(shown[0].audit_eligible);

    // Relatórios não existem na visão do auditor
    let err = state
        .report_service
        .list_reports(&state.db_pool, &auditor, &request, Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn writes_outside_scope_fail_closed() {
    let Some(state) = test_state().await else { return };
    let marketer = create_user(&state, UserRole::Marketer, None).await;
    let other = create_user(&state, UserRole::Marketer, None).await;
    let auditor = create_user(&state, UserRole::Auditor, None).await;
    let foreign = create_client(&state, &other, "PT Bukan Milikmu").await;

    let rename = UpdateClientPayload {
        id: foreign.id,
        patch: ClientPatch { name: Some("Sequestrado".into()), ..Default::default() },
    };
    let err = state
        .client_service
        .update_client(&state.db_pool, &marketer, rename.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = state
        .client_service
        .delete_client(&state.db_pool, &marketer, foreign.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // Auditor: só campos de faturamento, e só em cliente elegível
    let err = state
        .client_service
        .update_client(&state.db_pool, &auditor, rename)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let deal = create_deal_client(&state, &other, "PT Faturado").await;
    let billing = UpdateClientPayload {
        id: deal.id,
        patch: ClientPatch { dp_paid: Some(Decimal::new(2_500_000, 0)), ..Default::default() },
    };
    let updated = state
        .client_service
        .update_client(&state.db_pool, &auditor, billing)
        .await
        .unwrap();
    assert_eq!(updated.dp_paid, Decimal::new(2_500_000, 0));
    assert_eq!(updated.last_update, state.clock.today());
}
