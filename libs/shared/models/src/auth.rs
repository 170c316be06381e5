use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Doctor,
    Patient,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Doctor => write!(f, "doctor"),
            UserRole::Patient => write!(f, "patient"),
        }
    }
}

/// The signed-in portal user as reported by the login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortalUser {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub user: PortalUser,
}

/// Lifecycle notifications for the process-wide session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SignedIn(PortalUser),
    SignedOut,
    /// The backend rejected the credential, or it expired locally.
    Expired,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: Option<String>,
    pub role: Option<String>,
    pub exp: Option<i64>,
    pub iat: Option<i64>,
}
