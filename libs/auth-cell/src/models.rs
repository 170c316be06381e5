use serde::{Deserialize, Serialize};

use shared_models::auth::{PortalUser, UserRole};

/// Body returned by `POST /auth/token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user_id: i64,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
}

impl LoginResponse {
    pub fn user(&self) -> PortalUser {
        PortalUser {
            id: self.user_id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            role: self.role,
        }
    }
}

/// Which dashboard the signed-in user lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dashboard {
    /// Own appointment list, stats, report generation and completion.
    Doctor,
    /// Own appointment list and cancellation.
    Patient,
}

impl From<UserRole> for Dashboard {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::Doctor => Dashboard::Doctor,
            UserRole::Patient => Dashboard::Patient,
        }
    }
}
