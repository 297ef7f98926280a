use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use super::{Store, StoreError, UserFilter};
use crate::{
    sections::repo_types::{Section, SectionWithAdviser},
    users::repo_types::{RoleType, User, UserRow},
};

const USER_COLUMNS: &str = "internal_id, external_id, first_name, last_name, middle_initial, \
                            email, password_hash, role, created_at, created_by";

/// Postgres-backed store. Roles live in a JSONB column so users stay document-shaped.
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self::new(db))
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run database migrations")?;
        info!("database migrations applied");
        Ok(())
    }
}

async fn insert_user_tx(tx: &mut Transaction<'_, Postgres>, user: &User) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO users (internal_id, external_id, first_name, last_name, middle_initial,
                           email, password_hash, role, created_at, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(user.internal_id)
    .bind(&user.id)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.middle_initial)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(Json(&user.role))
    .bind(user.created_at)
    .bind(user.created_by)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn user_query(filter: &UserFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE TRUE"));
    if let Some(v) = &filter.id {
        qb.push(" AND external_id = ").push_bind(v.clone());
    }
    if let Some(v) = &filter.first_name {
        qb.push(" AND first_name = ").push_bind(v.clone());
    }
    if let Some(v) = &filter.last_name {
        qb.push(" AND last_name = ").push_bind(v.clone());
    }
    if let Some(v) = &filter.middle_initial {
        qb.push(" AND middle_initial = ").push_bind(v.clone());
    }
    if let Some(v) = &filter.email {
        qb.push(" AND email = ").push_bind(v.clone());
    }
    if let Some(v) = filter.role_type {
        qb.push(" AND role->>'type' = ").push_bind(v.as_str());
    }
    if let Some(v) = filter.section_id {
        qb.push(" AND role->>'sectionId' = ").push_bind(v.to_string());
    }
    if let Some(v) = filter.created_by {
        qb.push(" AND created_by = ").push_bind(v);
    }
    qb.push(" ORDER BY created_at ASC");
    qb
}

#[async_trait]
impl Store for PgStore {
    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError> {
        let mut qb = user_query(filter);
        let rows = qb.build_query_as::<UserRow>().fetch_all(&self.db).await?;
        debug!(count = rows.len(), "find_users");
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn find_user(&self, internal_id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE internal_id = $1"
        ))
        .bind(internal_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(User::from))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(User::from))
    }

    async fn find_user_by_external_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE external_id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(User::from))
    }

    async fn insert_users(&self, users: &[User]) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await?;
        for user in users {
            insert_user_tx(&mut tx, user).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_users_except(&self, keep: RoleType) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE role->>'type' <> $1")
            .bind(keep.as_str())
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_sections(&self) -> Result<Vec<SectionWithAdviser>, StoreError> {
        let sections = sqlx::query_as::<_, Section>(
            r#"
            SELECT internal_id, external_id, name, adviser_id, created_at, created_by
              FROM sections
             ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let adviser_ids: Vec<Uuid> = sections.iter().map(|s| s.adviser_id).collect();
        let advisers: HashMap<Uuid, User> = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE internal_id = ANY($1)"
        ))
        .bind(&adviser_ids)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|row| (row.internal_id, User::from(row)))
        .collect();

        Ok(sections
            .into_iter()
            .map(|section| SectionWithAdviser {
                adviser: advisers.get(&section.adviser_id).cloned(),
                section,
            })
            .collect())
    }

    async fn insert_section(&self, section: &Section, students: &[User]) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO sections (internal_id, external_id, name, adviser_id, created_at, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(section.internal_id)
        .bind(&section.id)
        .bind(&section.name)
        .bind(section.adviser_id)
        .bind(section.created_at)
        .bind(section.created_by)
        .execute(&mut *tx)
        .await?;

        for student in students {
            insert_user_tx(&mut tx, student).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
