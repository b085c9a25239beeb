//! Appeal registration.
//!
//! Authority staff enter a formal appeal either directly from a citizen's
//! written submission or by promoting a record from the bot intake
//! channel. Promotion links the two records and moves the intake record
//! into `in_progress`.

use crate::orm::appeals::{AppealStatus, Gender};
use crate::orm::intake_appeals::IntakeStatus;
use crate::orm::{appeals, intake_appeals, intake_history, organizations};
use crate::user::Actor;
use crate::workflow::history::{self, NewHistoryEntry};
use crate::workflow::WorkflowError;
use chrono::{Duration, NaiveDateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    TransactionTrait,
};

/// A new appeal as entered by authority staff.
#[derive(Debug, Clone)]
pub struct NewAppeal {
    pub full_name: String,
    pub gender: Gender,
    pub phone: Option<String>,
    pub doc_series: Option<String>,
    pub doc_number: Option<String>,
    pub address: Option<String>,
    pub birthday: Option<NaiveDateTime>,
    pub text: Option<String>,
    pub file_path: Option<String>,
    pub mahalla_id: Option<i32>,
    pub organization_id: Option<i32>,
    pub intake_appeal_id: Option<i32>,
    pub deadline: Option<NaiveDateTime>,
}

/// Register an appeal in `waiting`, with its creation history entry and,
/// when promoting an intake record, the intake-side linkage.
pub async fn create_appeal(
    db: &DatabaseConnection,
    actor: &Actor,
    new_appeal: NewAppeal,
) -> Result<appeals::Model, WorkflowError> {
    if !actor.is_authority() {
        return Err(WorkflowError::Forbidden);
    }

    let txn = db.begin().await?;

    // Promotion pre-checks: the intake record must exist, must not have
    // been withdrawn, and must not already back another appeal.
    let intake = match new_appeal.intake_appeal_id {
        Some(intake_id) => {
            let intake = intake_appeals::Entity::find_by_id(intake_id)
                .one(&txn)
                .await?
                .ok_or(WorkflowError::NotFound("Intake record"))?;

            if intake.status == IntakeStatus::Canceled {
                return Err(WorkflowError::Validation(
                    "This intake record was canceled by the citizen".to_string(),
                ));
            }

            let already_linked = appeals::Entity::find()
                .filter(appeals::Column::IntakeAppealId.eq(intake_id))
                .one(&txn)
                .await?;
            if already_linked.is_some() {
                return Err(WorkflowError::Conflict(
                    "An appeal is already linked to this intake record".to_string(),
                ));
            }

            Some(intake)
        }
        None => None,
    };

    let now = Utc::now().naive_utc();
    let deadline = new_appeal.deadline.unwrap_or_else(|| {
        now + Duration::days(crate::app_config::limits().default_deadline_days)
    });

    let appeal = appeals::ActiveModel {
        full_name: Set(new_appeal.full_name),
        gender: Set(new_appeal.gender),
        phone: Set(new_appeal.phone),
        doc_series: Set(new_appeal.doc_series),
        doc_number: Set(new_appeal.doc_number),
        address: Set(new_appeal.address),
        birthday: Set(new_appeal.birthday),
        text: Set(new_appeal.text),
        file_path: Set(new_appeal.file_path),
        status: Set(AppealStatus::Waiting),
        deadline: Set(Some(deadline)),
        viewed: Set(false),
        intake_appeal_id: Set(new_appeal.intake_appeal_id),
        mahalla_id: Set(new_appeal.mahalla_id),
        organization_id: Set(new_appeal.organization_id),
        created_at: Set(now),
        updated_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    history::append(
        &txn,
        NewHistoryEntry::status_change(appeal.id, actor.id, AppealStatus::Waiting)
            .with_text(Some("Appeal registered".to_string())),
    )
    .await?;

    if let Some(intake) = intake {
        let organization_name = match appeal.organization_id {
            Some(id) => organizations::Entity::find_by_id(id)
                .one(&txn)
                .await?
                .map(|o| o.name),
            None => None,
        };

        intake_appeals::Entity::update_many()
            .col_expr(
                intake_appeals::Column::Status,
                Expr::value(IntakeStatus::InProgress),
            )
            .filter(intake_appeals::Column::Id.eq(intake.id))
            .exec(&txn)
            .await?;

        intake_history::ActiveModel {
            intake_appeal_id: Set(intake.id),
            user_id: Set(Some(actor.id)),
            text: Set(Some(format!(
                "The appeal was routed to {}",
                organization_name
                    .as_deref()
                    .unwrap_or("the responsible organization")
            ))),
            status: Set(IntakeStatus::InProgress),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    log::info!("Appeal {} registered by user {}", appeal.id, actor.id);

    Ok(appeal)
}
