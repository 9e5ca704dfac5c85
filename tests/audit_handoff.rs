// tests/audit_handoff.rs

mod common;

use salesflow_backend::{
    common::error::AppError,
    models::{
        audit::ChecklistItemKey,
        auth::UserRole,
        client::{ClientPatch, UpdateClientPayload},
    },
    services::{client_service::ClientFilters, visibility::ScopeRequest},
};

use common::{create_client, create_deal_client, create_user, test_state, AUDITOR_NAME};

#[tokio::test]
async fn concurrent_first_reads_create_a_single_checklist() {
    let Some(state) = test_state().await else { return };
    let marketer = create_user(&state, UserRole::Marketer, None).await;
    let auditor = create_user(&state, UserRole::Auditor, None).await;
    let client = create_deal_client(&state, &marketer, "PT Audit Paralelo").await;

    let (a, b) = tokio::join!(
        state.audit_service.get_checklist(&state.db_pool, &auditor, client.id),
        state.audit_service.get_checklist(&state.db_pool, &auditor, client.id),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.len(), 7);
    let keys: Vec<_> = a.iter().map(|i| i.item_key).collect();
    assert_eq!(keys, ChecklistItemKey::ORDERED.to_vec());
    let ids_a: Vec<_> = a.iter().map(|i| i.id).collect();
    let ids_b: Vec<_> = b.iter().map(|i| i.id).collect();
    assert_eq!(ids_a, ids_b);

    // Terceira leitura: nada muda
    let again = state
        .audit_service
        .get_checklist(&state.db_pool, &auditor, client.id)
        .await
        .unwrap();
    assert_eq!(again.iter().map(|i| i.id).collect::<Vec<_>>(), ids_a);
}

#[tokio::test]
async fn ineligible_client_has_no_checklist() {
    let Some(state) = test_state().await else { return };
    let marketer = create_user(&state, UserRole::Marketer, None).await;
    let manager = create_user(&state, UserRole::Manager, None).await;
    let client = create_client(&state, &marketer, "PT Ainda Negociando").await;

    let err = state
        .audit_service
        .get_checklist(&state.db_pool, &manager, client.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let err = state
        .audit_service
        .get_checklist(&state.db_pool, &marketer, client.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn assignment_reports_notifications_and_unassign_keeps_progress() {
    let Some(state) = test_state().await else { return };
    let marketer = create_user(&state, UserRole::Marketer, None).await;
    let auditor = create_user(&state, UserRole::Auditor, None).await;
    let client = create_deal_client(&state, &marketer, "PT Serah Terima").await;

    let err = state
        .audit_service
        .assign_auditor(&state.db_pool, &auditor, client.id, "Fulano")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let outcome = state
        .audit_service
        .assign_auditor(&state.db_pool, &auditor, client.id, "budi")
        .await
        .unwrap();
    assert_eq!(outcome.client.auditor_assignee.as_deref(), Some(AUDITOR_NAME));
    assert_eq!(outcome.client.last_update, state.clock.today());
    // Gateways não configurados: falha informada, atribuição mantida
    assert!(!outcome.notification.whatsapp.sent);
    assert!(!outcome.notification.email.sent);
    assert!(outcome.notification.email.reason.is_some());

    let items = state
        .audit_service
        .get_checklist(&state.db_pool, &auditor, client.id)
        .await
        .unwrap();
    let toggled = state
        .audit_service
        .toggle_item(&state.db_pool, &auditor, items[0].id, true)
        .await
        .unwrap();
    assert!(toggled.checked);
    assert_eq!(toggled.checked_by, Some(auditor.user_id));

    let unassigned = state
        .audit_service
        .unassign_auditor(&state.db_pool, &auditor, client.id)
        .await
        .unwrap();
    assert_eq!(unassigned.auditor_assignee, None);

    let items = state
        .audit_service
        .get_checklist(&state.db_pool, &auditor, client.id)
        .await
        .unwrap();
    assert!(items[0].checked);
    assert!(items[1..].iter().all(|i| !i.checked));

    // Desmarcar limpa o carimbo
    let cleared = state
        .audit_service
        .toggle_item(&state.db_pool, &auditor, items[0].id, false)
        .await
        .unwrap();
    assert!(!cleared.checked);
    assert_eq!(cleared.checked_at, None);
    assert_eq!(cleared.checked_by, None);
}

#[tokio::test]
async fn client_patch_cannot_set_the_auditor() {
    let Some(state) = test_state().await else { return };
    let marketer = create_user(&state, UserRole::Marketer, None).await;
    let manager = create_user(&state, UserRole::Manager, None).await;
    let auditor = create_user(&state, UserRole::Auditor, None).await;
    let fresh = create_client(&state, &marketer, "PT Masih Baru").await;
    let deal = create_deal_client(&state, &marketer, "PT Siap Audit").await;

    let assign = |id, name: Option<&str>| UpdateClientPayload {
        id,
        patch: ClientPatch {
            auditor_assignee: Some(name.map(str::to_string)),
            ..Default::default()
        },
    };

    // Fora do roster, em cliente não elegível
    let err = state
        .client_service
        .update_client(&state.db_pool, &manager, assign(fresh.id, Some("Sicrano")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    // Nem mesmo um nome válido em cliente elegível passa pelo PUT /clients
    let err = state
        .client_service
        .update_client(&state.db_pool, &auditor, assign(deal.id, Some(AUDITOR_NAME)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let err = state
        .client_service
        .update_client(&state.db_pool, &manager, assign(deal.id, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let views = state
        .client_service
        .list_clients(&state.db_pool, &manager, &ScopeRequest::default(), ClientFilters::default())
        .await
        .unwrap();
    for id in [fresh.id, deal.id] {
        let view = views.iter().find(|v| v.client.id == id).unwrap();
        assert_eq!(view.client.auditor_assignee, None);
    }
}
