//! SeaORM Entity for the appeal_answers table
//!
//! Each row is one organization-side submission against an appeal. The
//! newest row is the operative answer; earlier ones are kept as record.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "appeal_answers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub appeal_id: i32,
    pub text: Option<String>,
    /// Requested extension date attachment, if the answer asks for time
    pub time_file: Option<String>,
    /// Final answer document addressed to the citizen
    pub report_citizen: Option<String>,
    /// Internal report addressed to the authority
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
}

impl ActiveModelBehavior for ActiveModel {}
