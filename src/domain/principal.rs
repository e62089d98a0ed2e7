use uuid::Uuid;

use super::errors::DomainError;

/// Roles issued by the external identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// The caller identity this service trusts. Authentication happens upstream;
/// the core only ever consumes `{id, role}`.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    /// Single capability check for every privileged operation.
    pub fn require_admin(&self) -> Result<(), DomainError> {
        match self.role {
            Role::Admin => Ok(()),
            Role::User => Err(DomainError::Forbidden),
        }
    }
}
