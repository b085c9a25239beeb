//! SeaORM Entity for the users table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Staff role tier.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(None)")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Organization staff, scoped to their own organization's appeals
    #[sea_orm(string_value = "user")]
    User,
    /// Authority staff
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Authority leadership
    #[sea_orm(string_value = "ceo")]
    Ceo,
}

impl UserRole {
    /// Whether this role acts with authority-tier power over any appeal.
    pub fn is_authority(&self) -> bool {
        matches!(self, Self::Admin | Self::Ceo)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub full_name: String,
    #[sea_orm(unique)]
    pub login: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub organization_id: Option<i32>,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organizations::Entity",
        from = "Column::OrganizationId",
        to = "super::organizations::Column::Id"
    )]
    Organization,
}

impl ActiveModelBehavior for ActiveModel {}
