//! SeaORM Entity for the appeal_comments table
//!
//! Authority-side notes recorded alongside each decision on an appeal.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "appeal_comments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub appeal_id: i32,
    pub text: Option<String>,
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
