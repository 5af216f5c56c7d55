use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Closed set of account roles carried in every token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Doctor => write!(f, "doctor"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// Operations gated by role rather than by ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    BookAppointment,
    CancelAsPatient,
    CancelAsDoctor,
    UpdateAppointmentStatus,
    RescheduleAppointment,
    ViewAllAppointments,
}

impl Role {
    pub fn can(&self, capability: Capability) -> bool {
        use Capability::*;

        match self {
            Role::Patient => matches!(
                capability,
                BookAppointment | CancelAsPatient | RescheduleAppointment
            ),
            Role::Doctor => matches!(
                capability,
                CancelAsDoctor | UpdateAppointmentStatus | RescheduleAppointment
            ),
            Role::Admin => matches!(capability, ViewAllAppointments),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Request-scoped identity inserted by the auth middleware.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.role.can(capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Role {} is not allowed to perform this action",
                self.role
            )))
        }
    }
}

impl TryFrom<JwtClaims> for AuthUser {
    type Error = String;

    fn try_from(claims: JwtClaims) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| "Invalid subject in token".to_string())?;

        Ok(Self {
            id,
            email: claims.email,
            role: claims.role,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: String,
    pub email: String,
    pub role: Role,
}
