//! SeaORM Entity for the appeals table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Workflow status of an appeal.
///
/// The allowed movements between these values are defined in one place,
/// `crate::workflow::transitions`; nothing else may write this column.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(None)")]
#[serde(rename_all = "snake_case")]
pub enum AppealStatus {
    /// Routed to the responsible organization, not yet taken up
    #[sea_orm(string_value = "waiting")]
    Waiting,
    /// The organization refused the appeal as not theirs
    #[sea_orm(string_value = "decline")]
    Decline,
    /// Actively being worked by the organization
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    /// Organization reports the work complete, pending authority review
    #[sea_orm(string_value = "confirm")]
    Confirm,
    /// Organization reports the work half complete
    #[sea_orm(string_value = "confirm_50")]
    Confirm50,
    /// Authority accepted a half-complete report; work continues
    #[sea_orm(string_value = "success_50")]
    Success50,
    /// Authority returned the appeal to the organization
    #[sea_orm(string_value = "rejected")]
    Rejected,
    /// Organization asked the authority for more time
    #[sea_orm(string_value = "time_request")]
    TimeRequest,
    /// Authority granted a new deadline
    #[sea_orm(string_value = "time_extended")]
    TimeExtended,
    /// Authority kept the existing deadline
    #[sea_orm(string_value = "time_denied")]
    TimeDenied,
    /// Closed with the requested outcome delivered
    #[sea_orm(string_value = "success_done")]
    SuccessDone,
    /// Closed with a written explanation instead of the requested outcome
    #[sea_orm(string_value = "text_done")]
    TextDone,
    /// Shelved by the authority before any work started
    #[sea_orm(string_value = "archive")]
    Archive,
}

impl AppealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Decline => "decline",
            Self::InProgress => "in_progress",
            Self::Confirm => "confirm",
            Self::Confirm50 => "confirm_50",
            Self::Success50 => "success_50",
            Self::Rejected => "rejected",
            Self::TimeRequest => "time_request",
            Self::TimeExtended => "time_extended",
            Self::TimeDenied => "time_denied",
            Self::SuccessDone => "success_done",
            Self::TextDone => "text_done",
            Self::Archive => "archive",
        }
    }
}

impl std::fmt::Display for AppealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AppealStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use sea_orm::Iterable;
        Self::iter().find(|v| v.as_str() == s).ok_or(())
    }
}

/// Citizen gender as captured on the intake form.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(None)")]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[sea_orm(string_value = "male")]
    Male,
    #[sea_orm(string_value = "female")]
    Female,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "appeals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub full_name: String,
    pub gender: Gender,
    pub phone: Option<String>,
    pub doc_series: Option<String>,
    pub doc_number: Option<String>,
    pub address: Option<String>,
    pub birthday: Option<chrono::NaiveDateTime>,
    pub file_path: Option<String>,
    pub text: Option<String>,
    pub status: AppealStatus,
    pub deadline: Option<chrono::NaiveDateTime>,
    pub viewed: bool,
    pub intake_appeal_id: Option<i32>,
    pub mahalla_id: Option<i32>,
    pub organization_id: Option<i32>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: Option<chrono::NaiveDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organizations::Entity",
        from = "Column::OrganizationId",
        to = "super::organizations::Column::Id"
    )]
    Organization,
    #[sea_orm(
        belongs_to = "super::mahallas::Entity",
        from = "Column::MahallaId",
        to = "super::mahallas::Column::Id"
    )]
    Mahalla,
    #[sea_orm(
        belongs_to = "super::intake_appeals::Entity",
        from = "Column::IntakeAppealId",
        to = "super::intake_appeals::Column::Id"
    )]
    IntakeAppeal,
}

impl ActiveModelBehavior for ActiveModel {}
