//! Authenticated principals.

use common::SubjectId;
use serde::{Deserialize, Serialize};

/// The kind of actor a credential was issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Vendor,
}

impl Role {
    /// Claim value for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Vendor => "vendor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "vendor" => Some(Role::Vendor),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The actor on whose behalf an order operation runs.
///
/// Built per request from a verified credential and never persisted. All
/// order reads and writes are scoped to `(role, subject_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub role: Role,
    pub subject_id: SubjectId,
}

impl Principal {
    pub fn new(role: Role, subject_id: impl Into<SubjectId>) -> Self {
        Self {
            role,
            subject_id: subject_id.into(),
        }
    }

    pub fn user(subject_id: impl Into<SubjectId>) -> Self {
        Self::new(Role::User, subject_id)
    }

    pub fn vendor(subject_id: impl Into<SubjectId>) -> Self {
        Self::new(Role::Vendor, subject_id)
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.role, self.subject_id)
    }
}
