//! Acting-staff profile resolved by the session middleware.

use crate::orm::users::{self, UserRole};
use crate::workflow::transitions::ActorTier;

/// The authenticated staff member behind a request.
#[derive(Clone, Debug, PartialEq)]
pub struct Actor {
    pub id: i32,
    pub name: String,
    pub role: UserRole,
    pub organization_id: Option<i32>,
}

impl Actor {
    pub fn is_authority(&self) -> bool {
        self.role.is_authority()
    }

    /// Which side of the workflow this actor drives.
    pub fn tier(&self) -> ActorTier {
        if self.is_authority() {
            ActorTier::Authority
        } else {
            ActorTier::Organization
        }
    }
}

impl From<users::Model> for Actor {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            name: user.full_name,
            role: user.role,
            organization_id: user.organization_id,
        }
    }
}
