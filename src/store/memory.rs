use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, UserFilter};
use crate::{
    sections::repo_types::{Section, SectionWithAdviser},
    users::repo_types::{RoleType, User},
};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    sections: Vec<Section>,
}

impl Collections {
    /// Rejects a batch that collides with stored users or with itself.
    fn check_new_users(&self, batch: &[User]) -> Result<(), StoreError> {
        for (i, user) in batch.iter().enumerate() {
            let mut existing = self.users.iter().chain(&batch[..i]);
            if let Some(clash) = existing.find(|u| u.email == user.email || u.id == user.id) {
                let field = if clash.email == user.email { "email" } else { "id" };
                return Err(StoreError::Duplicate(field.into()));
            }
        }
        Ok(())
    }
}

/// In-process store for local runs without a database, and for tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().filter(|u| filter.matches(u)).cloned().collect())
    }

    async fn find_user(&self, internal_id: Uuid) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.internal_id == internal_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_external_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_users(&self, users: &[User]) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.check_new_users(users)?;
        inner.users.extend_from_slice(users);
        Ok(())
    }

    async fn delete_users_except(&self, keep: RoleType) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.users.len();
        inner.users.retain(|u| u.role.kind() == keep);
        Ok((before - inner.users.len()) as u64)
    }

    async fn list_sections(&self) -> Result<Vec<SectionWithAdviser>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .sections
            .iter()
            .map(|section| SectionWithAdviser {
                section: section.clone(),
                adviser: inner
                    .users
                    .iter()
                    .find(|u| u.internal_id == section.adviser_id)
                    .cloned(),
            })
            .collect())
    }

    async fn insert_section(&self, section: &Section, students: &[User]) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.sections.iter().any(|s| s.id == section.id) {
            return Err(StoreError::Duplicate("id".into()));
        }
        inner.check_new_users(students)?;
        inner.sections.push(section.clone());
        inner.users.extend_from_slice(students);
        Ok(())
    }
}
