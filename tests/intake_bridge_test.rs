//! Integration tests for the linked-intake bridge and best-effort delivery

mod common;
use serial_test::serial;

use common::{database::*, fixtures::*};
use murajaat::orm::appeals::AppealStatus;
use murajaat::orm::intake_appeals::IntakeStatus;
use murajaat::orm::users::UserRole;
use murajaat::orm::{appeals, intake_appeals, intake_history};
use murajaat::workflow::{self, AuthorityDecision};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

fn decision(target: AppealStatus) -> AuthorityDecision {
    AuthorityDecision {
        target,
        text: Some("Reviewed".to_string()),
        new_deadline: None,
    }
}

async fn intake_history_count(db: &sea_orm::DatabaseConnection, intake_id: i32) -> u64 {
    intake_history::Entity::find()
        .filter(intake_history::Column::IntakeAppealId.eq(intake_id))
        .count(db)
        .await
        .expect("Failed to count intake history")
}

#[actix_rt::test]
#[serial]
async fn test_rejection_mirrors_to_intake() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let org = create_test_organization(&db, "Water Department")
        .await
        .unwrap();
    let chief = create_test_user(&db, "br_chief1", UserRole::Admin, None)
        .await
        .unwrap();
    create_test_intake_user(&db, 777001).await.unwrap();
    let intake = create_test_intake_appeal(&db, 777001, IntakeStatus::InProgress)
        .await
        .unwrap();
    let appeal = create_test_appeal(&db, AppealStatus::Confirm, Some(org.id), Some(intake.id))
        .await
        .unwrap();

    let notifier = RecordingNotifier::default();
    let storage = MemoryStorage::default();

    workflow::authority_transition(
        murajaat::db::get_db_pool(),
        &notifier,
        &storage,
        &actor_of(&chief),
        appeal.id,
        decision(AppealStatus::Rejected),
    )
    .await
    .expect("confirm -> rejected must succeed");

    let intake_reloaded = intake_appeals::Entity::find_by_id(intake.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(intake_reloaded.status, IntakeStatus::Rejected);
    assert_eq!(intake_history_count(&db, intake.id).await, 1);

    // Rejection carries no document.
    assert_eq!(notifier.attempt_count(), 0);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_archive_mirrors_to_intake() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let org = create_test_organization(&db, "Water Department")
        .await
        .unwrap();
    let chief = create_test_user(&db, "br_chief2", UserRole::Admin, None)
        .await
        .unwrap();
    create_test_intake_user(&db, 777002).await.unwrap();
    let intake = create_test_intake_appeal(&db, 777002, IntakeStatus::InProgress)
        .await
        .unwrap();
    let appeal = create_test_appeal(&db, AppealStatus::Waiting, Some(org.id), Some(intake.id))
        .await
        .unwrap();

    let notifier = RecordingNotifier::default();
    let storage = MemoryStorage::default();

    workflow::authority_transition(
        murajaat::db::get_db_pool(),
        &notifier,
        &storage,
        &actor_of(&chief),
        appeal.id,
        decision(AppealStatus::Archive),
    )
    .await
    .expect("waiting -> archive must succeed");

    let appeal_reloaded = appeals::Entity::find_by_id(appeal.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(appeal_reloaded.status, AppealStatus::Archive);

    let intake_reloaded = intake_appeals::Entity::find_by_id(intake.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(intake_reloaded.status, IntakeStatus::Archive);
    assert_eq!(intake_history_count(&db, intake.id).await, 1);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_done_mirrors_and_delivers_answer_document() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let org = create_test_organization(&db, "Water Department")
        .await
        .unwrap();
    let chief = create_test_user(&db, "br_chief3", UserRole::Admin, None)
        .await
        .unwrap();
    create_test_intake_user(&db, 777003).await.unwrap();
    let intake = create_test_intake_appeal(&db, 777003, IntakeStatus::InProgress)
        .await
        .unwrap();
    let appeal = create_test_appeal(&db, AppealStatus::Confirm50, Some(org.id), Some(intake.id))
        .await
        .unwrap();
    create_test_answer(&db, appeal.id, Some("final-answer.pdf"))
        .await
        .unwrap();

    let notifier = RecordingNotifier::default();
    let storage = MemoryStorage::with_object("final-answer.pdf", b"%PDF-1.4 answer");

    workflow::authority_transition(
        murajaat::db::get_db_pool(),
        &notifier,
        &storage,
        &actor_of(&chief),
        appeal.id,
        decision(AppealStatus::SuccessDone),
    )
    .await
    .expect("confirm_50 -> success_done must succeed");

    let appeal_reloaded = appeals::Entity::find_by_id(appeal.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(appeal_reloaded.status, AppealStatus::SuccessDone);

    let intake_reloaded = intake_appeals::Entity::find_by_id(intake.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(intake_reloaded.status, IntakeStatus::Done);
    assert_eq!(intake_history_count(&db, intake.id).await, 1);

    // Exactly one delivery attempt, addressed to the citizen's chat and
    // naming the appeal in the caption.
    let attempts = notifier.attempts.lock().unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].chat_id, 777003);
    assert_eq!(attempts[0].filename, "final-answer.pdf");
    assert!(attempts[0].caption.contains(&appeal.id.to_string()));
    drop(attempts);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_done_commits_even_when_delivery_fails() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let org = create_test_organization(&db, "Water Department")
        .await
        .unwrap();
    let chief = create_test_user(&db, "br_chief4", UserRole::Admin, None)
        .await
        .unwrap();
    create_test_intake_user(&db, 777004).await.unwrap();
    let intake = create_test_intake_appeal(&db, 777004, IntakeStatus::InProgress)
        .await
        .unwrap();
    let appeal = create_test_appeal(&db, AppealStatus::Confirm, Some(org.id), Some(intake.id))
        .await
        .unwrap();
    create_test_answer(&db, appeal.id, Some("final-answer.pdf"))
        .await
        .unwrap();

    let notifier = RecordingNotifier::failing();
    let storage = MemoryStorage::with_object("final-answer.pdf", b"%PDF-1.4 answer");

    // The notifier raising must not surface or roll the transition back.
    workflow::authority_transition(
        murajaat::db::get_db_pool(),
        &notifier,
        &storage,
        &actor_of(&chief),
        appeal.id,
        decision(AppealStatus::TextDone),
    )
    .await
    .expect("transition must commit despite delivery failure");

    assert_eq!(notifier.attempt_count(), 1);

    let appeal_reloaded = appeals::Entity::find_by_id(appeal.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(appeal_reloaded.status, AppealStatus::TextDone);

    let intake_reloaded = intake_appeals::Entity::find_by_id(intake.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(intake_reloaded.status, IntakeStatus::Done);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_done_without_intake_link_skips_bridge() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let org = create_test_organization(&db, "Water Department")
        .await
        .unwrap();
    let chief = create_test_user(&db, "br_chief5", UserRole::Admin, None)
        .await
        .unwrap();
    let appeal = create_test_appeal(&db, AppealStatus::Confirm, Some(org.id), None)
        .await
        .unwrap();
    create_test_answer(&db, appeal.id, Some("final-answer.pdf"))
        .await
        .unwrap();

    let notifier = RecordingNotifier::default();
    let storage = MemoryStorage::with_object("final-answer.pdf", b"%PDF-1.4 answer");

    workflow::authority_transition(
        murajaat::db::get_db_pool(),
        &notifier,
        &storage,
        &actor_of(&chief),
        appeal.id,
        decision(AppealStatus::SuccessDone),
    )
    .await
    .expect("confirm -> success_done must succeed");

    let appeal_reloaded = appeals::Entity::find_by_id(appeal.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(appeal_reloaded.status, AppealStatus::SuccessDone);

    // No intake record, no mirroring, no delivery.
    assert_eq!(notifier.attempt_count(), 0);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}

#[actix_rt::test]
#[serial]
async fn test_done_without_citizen_report_skips_delivery() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let org = create_test_organization(&db, "Water Department")
        .await
        .unwrap();
    let chief = create_test_user(&db, "br_chief6", UserRole::Admin, None)
        .await
        .unwrap();
    create_test_intake_user(&db, 777005).await.unwrap();
    let intake = create_test_intake_appeal(&db, 777005, IntakeStatus::InProgress)
        .await
        .unwrap();
    let appeal = create_test_appeal(&db, AppealStatus::Confirm, Some(org.id), Some(intake.id))
        .await
        .unwrap();
    create_test_answer(&db, appeal.id, None).await.unwrap();

    let notifier = RecordingNotifier::default();
    let storage = MemoryStorage::default();

    workflow::authority_transition(
        murajaat::db::get_db_pool(),
        &notifier,
        &storage,
        &actor_of(&chief),
        appeal.id,
        decision(AppealStatus::SuccessDone),
    )
    .await
    .expect("confirm -> success_done must succeed");

    // Mirrored but nothing to send.
    let intake_reloaded = intake_appeals::Entity::find_by_id(intake.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(intake_reloaded.status, IntakeStatus::Done);
    assert_eq!(notifier.attempt_count(), 0);

    cleanup_test_data(&db).await.expect("Failed to cleanup");
}
