use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    sections::repo_types::{Section, SectionWithAdviser},
    users::repo_types::{RoleType, User},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate {0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db) = err.as_database_error() {
            if db.is_unique_violation() {
                return StoreError::Duplicate(duplicate_field(db.constraint()).to_string());
            }
        }
        StoreError::Database(err)
    }
}

/// Names the field behind a unique-constraint violation, e.g. `users_email_key` -> `email`.
fn duplicate_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(c) if c.contains("email") => "email",
        Some(c) if c.contains("external_id") => "id",
        _ => "record",
    }
}

/// Field-equality filter over users. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_initial: Option<String>,
    pub email: Option<String>,
    pub role_type: Option<RoleType>,
    pub section_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        fn eq<T: PartialEq>(want: &Option<T>, got: &T) -> bool {
            want.as_ref().map_or(true, |w| w == got)
        }

        eq(&self.id, &user.id)
            && eq(&self.first_name, &user.first_name)
            && eq(&self.last_name, &user.last_name)
            && self
                .middle_initial
                .as_ref()
                .map_or(true, |w| user.middle_initial.as_ref() == Some(w))
            && eq(&self.email, &user.email)
            && eq(&self.role_type, &user.role.kind())
            && self
                .section_id
                .map_or(true, |w| user.role.section_id() == Some(w))
            && self.created_by.map_or(true, |w| user.created_by == Some(w))
    }
}

/// Document-store collaborator over the `users` and `sections` collections.
///
/// Multi-record inserts are all-or-nothing: either every record is written or none is.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError>;
    async fn find_user(&self, internal_id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_external_id(&self, id: &str) -> Result<Option<User>, StoreError>;
    async fn insert_users(&self, users: &[User]) -> Result<(), StoreError>;
    /// Removes every user whose role type differs from `keep`; returns how many were removed.
    async fn delete_users_except(&self, keep: RoleType) -> Result<u64, StoreError>;
    async fn list_sections(&self) -> Result<Vec<SectionWithAdviser>, StoreError>;
    async fn insert_section(&self, section: &Section, students: &[User]) -> Result<(), StoreError>;
}
