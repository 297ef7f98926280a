use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

/// Discriminant of a [`Role`]; the unit the authorization gate checks against.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, async_graphql::Enum,
)]
#[serde(rename_all = "camelCase")]
#[graphql(rename_items = "camelCase")]
pub enum RoleType {
    Admin,
    SchoolAdmin,
    Teacher,
    Student,
}

impl RoleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleType::Admin => "admin",
            RoleType::SchoolAdmin => "schoolAdmin",
            RoleType::Teacher => "teacher",
            RoleType::Student => "student",
        }
    }
}

/// Role stored on a user, persisted as `{ "type": "...", "sectionId": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Role {
    Admin,
    SchoolAdmin,
    Teacher,
    Student {
        #[serde(rename = "sectionId", default, skip_serializing_if = "Option::is_none")]
        section_id: Option<Uuid>,
    },
}

impl Role {
    /// Only students may reference a section.
    pub fn from_parts(kind: RoleType, section_id: Option<Uuid>) -> Result<Self, String> {
        match (kind, section_id) {
            (RoleType::Student, section_id) => Ok(Role::Student { section_id }),
            (_, Some(_)) => Err(format!("role {} cannot reference a section", kind.as_str())),
            (RoleType::Admin, None) => Ok(Role::Admin),
            (RoleType::SchoolAdmin, None) => Ok(Role::SchoolAdmin),
            (RoleType::Teacher, None) => Ok(Role::Teacher),
        }
    }

    pub fn kind(&self) -> RoleType {
        match self {
            Role::Admin => RoleType::Admin,
            Role::SchoolAdmin => RoleType::SchoolAdmin,
            Role::Teacher => RoleType::Teacher,
            Role::Student { .. } => RoleType::Student,
        }
    }

    pub fn section_id(&self) -> Option<Uuid> {
        match self {
            Role::Student { section_id } => *section_id,
            _ => None,
        }
    }
}

/// User record in the store.
#[derive(Debug, Clone)]
pub struct User {
    pub internal_id: Uuid,          // storage identifier
    pub id: String,                 // caller-supplied identifier
    pub first_name: String,
    pub last_name: String,
    pub middle_initial: Option<String>,
    pub email: String,              // login key
    pub password_hash: String,      // Argon2 hash, never returned
    pub role: Role,
    pub created_at: OffsetDateTime,
    pub created_by: Option<Uuid>,   // None for the bootstrap admin
}

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub internal_id: Uuid,
    pub external_id: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_initial: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub role: Json<Role>,
    pub created_at: OffsetDateTime,
    pub created_by: Option<Uuid>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            internal_id: r.internal_id,
            id: r.external_id,
            first_name: r.first_name,
            last_name: r.last_name,
            middle_initial: r.middle_initial,
            email: r.email,
            password_hash: r.password_hash,
            role: r.role.0,
            created_at: r.created_at,
            created_by: r.created_by,
        }
    }
}
