use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
    #[serde(rename_all = "snake_case")]
    pub enum UserRole {
        Employee => "employee",
        Manager => "manager",
        Admin => "admin",
    }
}

impl UserRole {
    pub fn is_manager_or_admin(&self) -> bool {
        matches!(self, UserRole::Manager | UserRole::Admin)
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Employee
    }
}

/// Directory entry for a person the engine acts on or for.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid, // UUID primary key
    pub full_name: String,
    pub email: String,
    pub department: Option<String>,
    pub role: UserRole,
    pub eligible_for_shift_work: bool,
}

impl UserProfile {
    pub fn is_manager_or_admin(&self) -> bool {
        self.role.is_manager_or_admin()
    }

    /// Owners may always act on their own records, elevated roles on anyone's
    pub fn can_access_user_resource(&self, resource_owner_id: Uuid) -> bool {
        self.id == resource_owner_id || self.is_manager_or_admin()
    }
}
