use async_graphql::{InputObject, SimpleObject, ID};
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use super::repo_types::{Role, RoleType, User};
use crate::{error::ApiError, store::UserFilter};

/// Role as seen over the API.
#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "Role")]
pub struct RoleView {
    #[graphql(name = "type")]
    pub kind: RoleType,
    pub section_id: Option<ID>,
}

impl From<&Role> for RoleView {
    fn from(role: &Role) -> Self {
        Self {
            kind: role.kind(),
            section_id: role.section_id().map(|id| ID(id.to_string())),
        }
    }
}

/// Public part of the user returned to the client. Never carries the password hash.
#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "User")]
pub struct PublicUser {
    #[graphql(name = "_id")]
    pub internal_id: ID,
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_initial: Option<String>,
    pub email: String,
    pub role: RoleView,
    pub created_at: String,
    pub created_by: Option<ID>,
}

pub(crate) fn format_timestamp(ts: time::OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| ts.to_string())
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            internal_id: ID(u.internal_id.to_string()),
            id: u.id.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            middle_initial: u.middle_initial.clone(),
            email: u.email.clone(),
            role: RoleView::from(&u.role),
            created_at: format_timestamp(u.created_at),
            created_by: u.created_by.map(|id| ID(id.to_string())),
        }
    }
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self::from(&u)
    }
}

#[derive(Debug, Clone, InputObject)]
pub struct RoleInput {
    #[graphql(name = "type")]
    pub kind: RoleType,
    pub section_id: Option<ID>,
}

/// Request body for user creation.
#[derive(Debug, Clone, InputObject)]
pub struct UserInput {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_initial: Option<String>,
    pub email: String,
    pub password: String,
    pub role: Option<RoleInput>,
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct UserFilterInput {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_initial: Option<String>,
    pub email: Option<String>,
    pub role_type: Option<RoleType>,
    pub section_id: Option<ID>,
    pub created_by: Option<ID>,
}

pub(crate) fn parse_id(value: &ID, field: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value.as_str())
        .map_err(|_| ApiError::Validation(format!("{field} is not a valid id")))
}

impl TryFrom<UserFilterInput> for UserFilter {
    type Error = ApiError;

    fn try_from(f: UserFilterInput) -> Result<Self, Self::Error> {
        Ok(Self {
            id: f.id,
            first_name: f.first_name,
            last_name: f.last_name,
            middle_initial: f.middle_initial,
            email: f.email.map(|e| e.trim().to_lowercase()),
            role_type: f.role_type,
            section_id: f.section_id.as_ref().map(|v| parse_id(v, "sectionId")).transpose()?,
            created_by: f.created_by.as_ref().map(|v| parse_id(v, "createdBy")).transpose()?,
        })
    }
}
