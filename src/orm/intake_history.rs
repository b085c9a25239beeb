//! SeaORM Entity for the intake_history table
//!
//! Append-only audit trail of an intake record's lifecycle, written by the
//! intake endpoints and by the appeal workflow bridge.

use sea_orm::entity::prelude::*;

use super::intake_appeals::IntakeStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "intake_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub intake_appeal_id: i32,
    /// Acting staff user; null for citizen-initiated events
    pub user_id: Option<i32>,
    pub text: Option<String>,
    pub status: IntakeStatus,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::intake_appeals::Entity",
        from = "Column::IntakeAppealId",
        to = "super::intake_appeals::Column::Id"
    )]
    IntakeAppeal,
}

impl ActiveModelBehavior for ActiveModel {}
