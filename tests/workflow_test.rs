//! Integration tests for the appeal status workflow

mod common;
use serial_test::serial;

use common::{database::*, fixtures::*};
use murajaat::orm::appeals::AppealStatus;
use murajaat::orm::users::UserRole;
use murajaat::orm::{appeal_history, appeals};
use murajaat::workflow::{
    self, AuthorityDecision, OrganizationAnswer, WorkflowError,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

fn answer(target: AppealStatus) -> OrganizationAnswer {
    OrganizationAnswer {
        target,
        text: Some("Taken into work".to_string()),
        time_file: None,
        report_citizen: None,
        report_government: None,
        report_photo: None,
    }
}

fn decision(target: AppealStatus) -> AuthorityDecision {
    AuthorityDecision {
        target,
        text: Some("Reviewed".to_string()),
        new_deadline: None,
    }
}

async fn history_count(db: &sea_orm::DatabaseConnection, appeal_id: i32) -> u64 {
    appeal_history::Entity::find()
        .filter(appeal_history::Column::AppealId.eq(appeal_id))
        .count(db)
        .await
        .expect("Failed to count history")
}

#[actix_rt::test]
#[serial]
async fn test_organization_pickup_and_no_self_loop() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let org = create_test_organization(&db, "Water Department")
        .await
        .unwrap();
    let staff = create_test_user(&db, "wf_staff1", UserRole::User, Some(org.id))
        .await
        .unwrap();
    let actor = actor_of(&staff);

    let appeal = create_test_appeal(&db, AppealStatus::Waiting, Some(org.id), None)
        .await
        .unwrap();

    workflow::organization_transition(
        murajaat::db::get_db_pool(),
        &actor,
        appeal.id,
        answer(AppealStatus::InProgress),
    )
    .await
    .expect("waiting -> in_progress must succeed");

    let reloaded = appeals::Entity::find_by_id(appeal.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.status, AppealStatus::InProgress);

    // Exactly one history entry recording the new status.
    let entries = appeal_history::Entity::find()
        .filter(appeal_history::Column::AppealId.eq(appeal.id))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status.as_deref(), Some("in_progress"));

    // Retrying the same target is a self-loop and must be rejected.
    let retry = workflow::organization_transition(
        murajaat::db::get_db_pool(),
        &actor,
        appeal.id,
        answer(AppealStatus::InProgress),
    )
    .await;
    assert!(matches!(
        retry,
        Err(WorkflowError::InvalidTransition { .. })
    ));
    assert_eq!(history_count(&db, appeal.id).await, 1);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_foreign_organization_is_forbidden() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let org = create_test_organization(&db, "Water Department")
        .await
        .unwrap();
    let other_org = create_test_organization(&db, "Road Service").await.unwrap();
    let outsider = create_test_user(&db, "wf_outsider", UserRole::User, Some(other_org.id))
        .await
        .unwrap();

    let appeal = create_test_appeal(&db, AppealStatus::Waiting, Some(org.id), None)
        .await
        .unwrap();

    let result = workflow::organization_transition(
        murajaat::db::get_db_pool(),
        &actor_of(&outsider),
        appeal.id,
        answer(AppealStatus::InProgress),
    )
    .await;

    assert!(matches!(result, Err(WorkflowError::Forbidden)));

    let reloaded = appeals::Entity::find_by_id(appeal.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.status, AppealStatus::Waiting);
    assert_eq!(history_count(&db, appeal.id).await, 0);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_terminal_appeals_accept_no_transition() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let org = create_test_organization(&db, "Water Department")
        .await
        .unwrap();
    let staff = create_test_user(&db, "wf_staff2", UserRole::User, Some(org.id))
        .await
        .unwrap();
    let chief = create_test_user(&db, "wf_chief1", UserRole::Admin, None)
        .await
        .unwrap();
    let notifier = RecordingNotifier::default();
    let storage = MemoryStorage::default();

    for terminal in [AppealStatus::SuccessDone, AppealStatus::TextDone] {
        let appeal = create_test_appeal(&db, terminal, Some(org.id), None)
            .await
            .unwrap();

        let org_result = workflow::organization_transition(
            murajaat::db::get_db_pool(),
            &actor_of(&staff),
            appeal.id,
            answer(AppealStatus::InProgress),
        )
        .await;
        assert!(matches!(
            org_result,
            Err(WorkflowError::InvalidTransition { .. })
        ));

        let authority_result = workflow::authority_transition(
            murajaat::db::get_db_pool(),
            &notifier,
            &storage,
            &actor_of(&chief),
            appeal.id,
            decision(AppealStatus::Rejected),
        )
        .await;
        assert!(matches!(
            authority_result,
            Err(WorkflowError::InvalidTransition { .. })
        ));

        let reloaded = appeals::Entity::find_by_id(appeal.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.status, terminal);
    }

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_authority_has_no_move_from_in_progress() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let org = create_test_organization(&db, "Water Department")
        .await
        .unwrap();
    let chief = create_test_user(&db, "wf_chief2", UserRole::Ceo, None)
        .await
        .unwrap();
    let notifier = RecordingNotifier::default();
    let storage = MemoryStorage::default();

    let appeal = create_test_appeal(&db, AppealStatus::InProgress, Some(org.id), None)
        .await
        .unwrap();

    // The authority acts only on escalated states; mid-work appeals reject
    // it through the table, not the role check.
    let result = workflow::authority_transition(
        murajaat::db::get_db_pool(),
        &notifier,
        &storage,
        &actor_of(&chief),
        appeal.id,
        decision(AppealStatus::SuccessDone),
    )
    .await;
    assert!(matches!(
        result,
        Err(WorkflowError::InvalidTransition { .. })
    ));

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_organization_staff_cannot_use_authority_side() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let org = create_test_organization(&db, "Water Department")
        .await
        .unwrap();
    let staff = create_test_user(&db, "wf_staff3", UserRole::User, Some(org.id))
        .await
        .unwrap();
    let notifier = RecordingNotifier::default();
    let storage = MemoryStorage::default();

    let appeal = create_test_appeal(&db, AppealStatus::Confirm, Some(org.id), None)
        .await
        .unwrap();

    let result = workflow::authority_transition(
        murajaat::db::get_db_pool(),
        &notifier,
        &storage,
        &actor_of(&staff),
        appeal.id,
        decision(AppealStatus::SuccessDone),
    )
    .await;
    assert!(matches!(result, Err(WorkflowError::Forbidden)));

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_extension_requires_deadline() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let org = create_test_organization(&db, "Water Department")
        .await
        .unwrap();
    let chief = create_test_user(&db, "wf_chief3", UserRole::Admin, None)
        .await
        .unwrap();
    let notifier = RecordingNotifier::default();
    let storage = MemoryStorage::default();

    let appeal = create_test_appeal(&db, AppealStatus::TimeRequest, Some(org.id), None)
        .await
        .unwrap();

    let missing = workflow::authority_transition(
        murajaat::db::get_db_pool(),
        &notifier,
        &storage,
        &actor_of(&chief),
        appeal.id,
        decision(AppealStatus::TimeExtended),
    )
    .await;
    assert!(matches!(missing, Err(WorkflowError::Validation(_))));

    // The failed attempt changes nothing.
    let reloaded = appeals::Entity::find_by_id(appeal.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.status, AppealStatus::TimeRequest);
    assert_eq!(history_count(&db, appeal.id).await, 0);

    // With a deadline the extension lands and the appeal goes back to work.
    let new_deadline = chrono::NaiveDate::from_ymd_opt(2030, 1, 15)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    workflow::authority_transition(
        murajaat::db::get_db_pool(),
        &notifier,
        &storage,
        &actor_of(&chief),
        appeal.id,
        AuthorityDecision {
            target: AppealStatus::TimeExtended,
            text: None,
            new_deadline: Some(new_deadline),
        },
    )
    .await
    .expect("time_request -> time_extended must succeed");

    let reloaded = appeals::Entity::find_by_id(appeal.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.status, AppealStatus::InProgress);
    assert_eq!(reloaded.deadline, Some(new_deadline));
    assert_eq!(history_count(&db, appeal.id).await, 1);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_denied_extension_keeps_deadline() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let org = create_test_organization(&db, "Water Department")
        .await
        .unwrap();
    let chief = create_test_user(&db, "wf_chief4", UserRole::Admin, None)
        .await
        .unwrap();
    let notifier = RecordingNotifier::default();
    let storage = MemoryStorage::default();

    let appeal = create_test_appeal(&db, AppealStatus::TimeRequest, Some(org.id), None)
        .await
        .unwrap();
    let original_deadline = appeal.deadline;

    workflow::authority_transition(
        murajaat::db::get_db_pool(),
        &notifier,
        &storage,
        &actor_of(&chief),
        appeal.id,
        decision(AppealStatus::TimeDenied),
    )
    .await
    .expect("time_request -> time_denied must succeed");

    let reloaded = appeals::Entity::find_by_id(appeal.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.status, AppealStatus::InProgress);
    assert_eq!(reloaded.deadline, original_deadline);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_partial_acceptance_returns_to_work() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let org = create_test_organization(&db, "Water Department")
        .await
        .unwrap();
    let chief = create_test_user(&db, "wf_chief5", UserRole::Admin, None)
        .await
        .unwrap();
    let notifier = RecordingNotifier::default();
    let storage = MemoryStorage::default();

    let appeal = create_test_appeal(&db, AppealStatus::Confirm50, Some(org.id), None)
        .await
        .unwrap();

    workflow::authority_transition(
        murajaat::db::get_db_pool(),
        &notifier,
        &storage,
        &actor_of(&chief),
        appeal.id,
        decision(AppealStatus::Success50),
    )
    .await
    .expect("confirm_50 -> success_50 must succeed");

    let reloaded = appeals::Entity::find_by_id(appeal.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.status, AppealStatus::InProgress);

    // The history entry records the stored status, not the verdict label.
    let entries = appeal_history::Entity::find()
        .filter(appeal_history::Column::AppealId.eq(appeal.id))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status.as_deref(), Some("in_progress"));

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_rejected_appeal_can_be_resubmitted() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let org = create_test_organization(&db, "Water Department")
        .await
        .unwrap();
    let staff = create_test_user(&db, "wf_staff4", UserRole::User, Some(org.id))
        .await
        .unwrap();

    let appeal = create_test_appeal(&db, AppealStatus::Rejected, Some(org.id), None)
        .await
        .unwrap();

    workflow::organization_transition(
        murajaat::db::get_db_pool(),
        &actor_of(&staff),
        appeal.id,
        answer(AppealStatus::Confirm),
    )
    .await
    .expect("rejected -> confirm must succeed");

    let reloaded = appeals::Entity::find_by_id(appeal.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.status, AppealStatus::Confirm);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}
