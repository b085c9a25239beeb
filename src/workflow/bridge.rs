//! Linked-intake bridge.
//!
//! When an appeal originated from the bot intake channel, the authority's
//! terminal decisions are mirrored onto the intake record: archive and
//! rejection translate directly, and either done-variant marks the intake
//! record done and pushes the organization's final answer document to the
//! citizen. Mirroring runs inside the transition's transaction; the
//! document delivery runs after commit and never fails the transition.

use crate::notifier::Notifier;
use crate::orm::intake_appeals::IntakeStatus;
use crate::orm::{appeal_answers, appeals, intake_appeals, intake_history};
use crate::storage::StorageBackend;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, QueryOrder,
};

/// A pending best-effort push of the final answer document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentDelivery {
    pub chat_id: i64,
    pub reference: String,
    pub caption: String,
}

/// Set the intake record's status and append the matching audit entry.
async fn set_intake_status<C: ConnectionTrait>(
    conn: &C,
    intake_id: i32,
    status: IntakeStatus,
    user_id: i32,
    text: String,
) -> Result<(), DbErr> {
    intake_appeals::Entity::update_many()
        .col_expr(intake_appeals::Column::Status, Expr::value(status))
        .filter(intake_appeals::Column::Id.eq(intake_id))
        .exec(conn)
        .await?;

    intake_history::ActiveModel {
        intake_appeal_id: Set(intake_id),
        user_id: Set(Some(user_id)),
        text: Set(Some(text)),
        status: Set(status),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    Ok(())
}

/// Mirror an authority archive decision.
pub(super) async fn mirror_archive<C: ConnectionTrait>(
    conn: &C,
    intake: &intake_appeals::Model,
    user_id: i32,
) -> Result<(), DbErr> {
    set_intake_status(
        conn,
        intake.id,
        IntakeStatus::Archive,
        user_id,
        "The appeal was archived".to_string(),
    )
    .await
}

/// Mirror an authority rejection, naming the organization the appeal went
/// back to.
pub(super) async fn mirror_rejected<C: ConnectionTrait>(
    conn: &C,
    intake: &intake_appeals::Model,
    user_id: i32,
    organization_name: &str,
) -> Result<(), DbErr> {
    set_intake_status(
        conn,
        intake.id,
        IntakeStatus::Rejected,
        user_id,
        format!(
            "The authority returned the appeal to {}",
            organization_name
        ),
    )
    .await
}

/// Mirror a terminal done decision and, when the latest organization answer
/// carries a citizen report, prepare its delivery.
pub(super) async fn mirror_done<C: ConnectionTrait>(
    conn: &C,
    appeal: &appeals::Model,
    intake: &intake_appeals::Model,
    user_id: i32,
) -> Result<Option<DocumentDelivery>, DbErr> {
    set_intake_status(
        conn,
        intake.id,
        IntakeStatus::Done,
        user_id,
        "The appeal was resolved".to_string(),
    )
    .await?;

    let last_answer = appeal_answers::Entity::find()
        .filter(appeal_answers::Column::AppealId.eq(appeal.id))
        .order_by_desc(appeal_answers::Column::CreatedAt)
        .one(conn)
        .await?;

    Ok(last_answer
        .and_then(|answer| answer.report_citizen)
        .map(|reference| DocumentDelivery {
            chat_id: intake.chat_id,
            reference,
            caption: format!("The authority's answer to your appeal #{}", appeal.id),
        }))
}

/// Push the answer document to the citizen. Best-effort: every failure is
/// logged and swallowed so it cannot undo the committed transition.
pub async fn deliver_answer_document(
    notifier: &dyn Notifier,
    storage: &dyn StorageBackend,
    delivery: &DocumentDelivery,
) {
    let data = match storage.read_object(&delivery.reference).await {
        Ok(data) => data,
        Err(e) => {
            log::warn!(
                "Skipping answer delivery to chat {}: could not read {}: {}",
                delivery.chat_id,
                delivery.reference,
                e
            );
            return;
        }
    };

    let filename = delivery
        .reference
        .rsplit('/')
        .next()
        .unwrap_or(delivery.reference.as_str());

    match notifier
        .send_document(delivery.chat_id, filename, data, &delivery.caption)
        .await
    {
        Ok(()) => log::info!("Delivered answer document to chat {}", delivery.chat_id),
        Err(e) => log::warn!(
            "Failed to deliver answer document to chat {}: {}",
            delivery.chat_id,
            e
        ),
    }
}
