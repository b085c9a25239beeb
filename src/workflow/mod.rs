//! The appeal status workflow.
//!
//! Two entry points mutate an appeal's status: [`organization_transition`]
//! for the assigned organization's staff and [`authority_transition`] for
//! authority-tier staff. Both validate the move against the transition
//! table, then apply the status change, the answer/comment record and the
//! history entry in one transaction; intake mirroring joins that
//! transaction, and the citizen-facing document delivery runs after commit
//! as a best-effort side task.

pub mod bridge;
pub mod error;
pub mod history;
pub mod transitions;

pub use error::WorkflowError;

use crate::notifier::Notifier;
use crate::orm::appeals::AppealStatus;
use crate::orm::{appeal_answers, appeal_comments, appeals, intake_appeals, organizations};
use crate::storage::StorageBackend;
use crate::user::Actor;
use bridge::DocumentDelivery;
use chrono::{NaiveDateTime, Utc};
use history::NewHistoryEntry;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, TransactionTrait,
};
use transitions::ActorTier;

/// Organization-side submission: the proposed target status plus the
/// answer text and report attachments backing it.
#[derive(Debug, Clone)]
pub struct OrganizationAnswer {
    pub target: AppealStatus,
    pub text: Option<String>,
    pub time_file: Option<String>,
    pub report_citizen: Option<String>,
    pub report_government: Option<String>,
    pub report_photo: Option<String>,
}

/// Authority-side decision: the proposed target status, an optional note,
/// and the new deadline when granting an extension.
#[derive(Debug, Clone)]
pub struct AuthorityDecision {
    pub target: AppealStatus,
    pub text: Option<String>,
    pub new_deadline: Option<NaiveDateTime>,
}

/// The one ownership predicate applied before every organization-side
/// entry point: the actor must be staff of the appeal's assigned
/// organization.
pub fn owns_appeal(actor: &Actor, appeal: &appeals::Model) -> bool {
    match (actor.organization_id, appeal.organization_id) {
        (Some(own), Some(assigned)) => own == assigned,
        _ => false,
    }
}

/// Validate the proposed move against the transition table.
fn check_transition(
    current: AppealStatus,
    tier: ActorTier,
    target: AppealStatus,
) -> Result<AppealStatus, WorkflowError> {
    if transitions::is_terminal(current)
        || !transitions::allowed_targets(current, tier).contains(&target)
    {
        return Err(WorkflowError::InvalidTransition {
            from: current,
            to: target,
        });
    }
    Ok(transitions::stored_status(target))
}

/// Apply the status mutation, guarded against a concurrent transition: the
/// update only matches the status this transaction read, so a lost update
/// surfaces as `Conflict` instead of silently overwriting.
async fn update_status_guarded<C: ConnectionTrait>(
    conn: &C,
    appeal: &appeals::Model,
    new_status: AppealStatus,
    new_deadline: Option<NaiveDateTime>,
) -> Result<(), WorkflowError> {
    let mut update = appeals::Entity::update_many()
        .col_expr(appeals::Column::Status, Expr::value(new_status))
        .col_expr(
            appeals::Column::UpdatedAt,
            Expr::value(Some(Utc::now().naive_utc())),
        )
        .filter(appeals::Column::Id.eq(appeal.id))
        .filter(appeals::Column::Status.eq(appeal.status));

    if let Some(deadline) = new_deadline {
        update = update.col_expr(appeals::Column::Deadline, Expr::value(Some(deadline)));
    }

    let result = update.exec(conn).await?;
    if result.rows_affected == 0 {
        return Err(WorkflowError::Conflict(
            "The appeal was changed by another actor; reload and retry".to_string(),
        ));
    }

    Ok(())
}

/// Organization staff progress their appeal: intake pickup, refusal,
/// completion reports, and extension requests.
pub async fn organization_transition(
    db: &DatabaseConnection,
    actor: &Actor,
    appeal_id: i32,
    answer: OrganizationAnswer,
) -> Result<appeal_answers::Model, WorkflowError> {
    let txn = db.begin().await?;

    let appeal = appeals::Entity::find_by_id(appeal_id)
        .one(&txn)
        .await?
        .ok_or(WorkflowError::NotFound("Appeal"))?;

    if !owns_appeal(actor, &appeal) {
        return Err(WorkflowError::Forbidden);
    }

    let stored = check_transition(appeal.status, ActorTier::Organization, answer.target)?;
    update_status_guarded(&txn, &appeal, stored, None).await?;

    let answer_model = appeal_answers::ActiveModel {
        appeal_id: Set(appeal.id),
        text: Set(answer.text.clone()),
        time_file: Set(answer.time_file.clone()),
        report_citizen: Set(answer.report_citizen.clone()),
        report_government: Set(answer.report_government.clone()),
        report_photo: Set(answer.report_photo.clone()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    history::append(
        &txn,
        NewHistoryEntry {
            appeal_id: appeal.id,
            user_id: actor.id,
            status: Some(stored),
            text: answer.text,
            time_file: answer.time_file,
            report_citizen: answer.report_citizen,
            report_government: answer.report_government,
            report_photo: answer.report_photo,
        },
    )
    .await?;

    txn.commit().await?;

    log::info!(
        "Appeal {} moved {} -> {} by organization user {}",
        appeal.id,
        appeal.status,
        stored,
        actor.id
    );

    Ok(answer_model)
}

/// Authority staff rule on an appeal: archive, reopen, extension verdicts,
/// partial acceptance, rejection, and the two terminal done states.
pub async fn authority_transition(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    storage: &dyn StorageBackend,
    actor: &Actor,
    appeal_id: i32,
    decision: AuthorityDecision,
) -> Result<appeal_comments::Model, WorkflowError> {
    if !actor.is_authority() {
        return Err(WorkflowError::Forbidden);
    }

    let txn = db.begin().await?;

    let appeal = appeals::Entity::find_by_id(appeal_id)
        .one(&txn)
        .await?
        .ok_or(WorkflowError::NotFound("Appeal"))?;

    let stored = check_transition(appeal.status, ActorTier::Authority, decision.target)?;

    let new_deadline = if decision.target == AppealStatus::TimeExtended {
        Some(decision.new_deadline.ok_or_else(|| {
            WorkflowError::Validation(
                "Granting an extension requires the new deadline".to_string(),
            )
        })?)
    } else {
        None
    };

    update_status_guarded(&txn, &appeal, stored, new_deadline).await?;

    let comment = appeal_comments::ActiveModel {
        appeal_id: Set(appeal.id),
        text: Set(decision.text.clone()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    history::append(
        &txn,
        NewHistoryEntry::status_change(appeal.id, actor.id, stored).with_text(decision.text),
    )
    .await?;

    let delivery = run_intake_bridge(&txn, &appeal, stored, actor.id).await?;

    txn.commit().await?;

    log::info!(
        "Appeal {} moved {} -> {} by authority user {}",
        appeal.id,
        appeal.status,
        stored,
        actor.id
    );

    if let Some(delivery) = delivery {
        bridge::deliver_answer_document(notifier, storage, &delivery).await;
    }

    Ok(comment)
}

/// Mirror the decision onto a linked intake record, if any. Returns the
/// document delivery to attempt once the transaction has committed.
async fn run_intake_bridge<C: ConnectionTrait>(
    conn: &C,
    appeal: &appeals::Model,
    stored: AppealStatus,
    user_id: i32,
) -> Result<Option<DocumentDelivery>, WorkflowError> {
    let intake_id = match appeal.intake_appeal_id {
        Some(id) => id,
        None => return Ok(None),
    };

    if !matches!(
        stored,
        AppealStatus::Archive
            | AppealStatus::Rejected
            | AppealStatus::SuccessDone
            | AppealStatus::TextDone
    ) {
        return Ok(None);
    }

    let intake = match intake_appeals::Entity::find_by_id(intake_id).one(conn).await? {
        Some(intake) => intake,
        None => {
            log::warn!(
                "Appeal {} references missing intake record {}",
                appeal.id,
                intake_id
            );
            return Ok(None);
        }
    };

    match stored {
        AppealStatus::Archive => {
            bridge::mirror_archive(conn, &intake, user_id).await?;
            Ok(None)
        }
        AppealStatus::Rejected => {
            let organization_name = match appeal.organization_id {
                Some(id) => organizations::Entity::find_by_id(id)
                    .one(conn)
                    .await?
                    .map(|o| o.name),
                None => None,
            };
            bridge::mirror_rejected(
                conn,
                &intake,
                user_id,
                organization_name
                    .as_deref()
                    .unwrap_or("the responsible organization"),
            )
            .await?;
            Ok(None)
        }
        AppealStatus::SuccessDone | AppealStatus::TextDone => {
            Ok(bridge::mirror_done(conn, appeal, &intake, user_id).await?)
        }
        _ => Ok(None),
    }
}
