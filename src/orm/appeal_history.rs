//! SeaORM Entity for the appeal_history table
//!
//! Append-only audit log. Rows are inserted in the same transaction as the
//! status change they describe and are never updated or deleted.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "appeal_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub appeal_id: i32,
    pub user_id: i32,
    /// Resulting appeal status; null for free-text annotations
    pub status: Option<String>,
    pub text: Option<String>,
    pub time_file: Option<String>,
    pub report_citizen: Option<String>,
    pub report_government: Option<String>,
    pub report_photo: Option<String>,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::appeals::Entity",
        from = "Column::AppealId",
        to = "super::appeals::Column::Id"
    )]
    Appeal,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl ActiveModelBehavior for ActiveModel {}
