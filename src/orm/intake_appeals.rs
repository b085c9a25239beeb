//! SeaORM Entity for the intake_appeals table
//!
//! A grievance submitted through the bot channel. It has its own small
//! lifecycle, mirrored from the formal appeal it may be promoted into.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of an intake record.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(None)")]
#[serde(rename_all = "snake_case")]
pub enum IntakeStatus {
    /// Submitted, not yet sorted by the authority
    #[sea_orm(string_value = "new")]
    New,
    /// Promoted into a formal appeal that is being worked
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    /// Withdrawn or discarded before promotion
    #[sea_orm(string_value = "canceled")]
    Canceled,
    /// The promoted appeal reached a terminal done state
    #[sea_orm(string_value = "done")]
    Done,
    /// The promoted appeal was archived by the authority
    #[sea_orm(string_value = "archive")]
    Archive,
    /// The promoted appeal was returned to the organization
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl IntakeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Canceled => "canceled",
            Self::Done => "done",
            Self::Archive => "archive",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "intake_appeals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub chat_id: i64,
    pub full_name: String,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub birthday: Option<String>,
    pub address: Option<String>,
    pub mahalla: Option<String>,
    pub text: Option<String>,
    pub file_path: Option<String>,
    pub status: IntakeStatus,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::intake_users::Entity",
        from = "Column::ChatId",
        to = "super::intake_users::Column::ChatId"
    )]
    IntakeUser,
}

impl ActiveModelBehavior for ActiveModel {}
