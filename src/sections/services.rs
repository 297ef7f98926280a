use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::repo_types::{Section, SectionWithAdviser};
use crate::{
    error::ApiError,
    store::Store,
    users::{
        dto::UserInput,
        repo_types::{Role, RoleType},
        services::build_user,
    },
};

pub struct NewSection {
    pub id: String,
    pub name: String,
    pub adviser_id: String, // external id of the adviser
    pub students: Vec<UserInput>,
}

#[instrument(skip(store))]
pub async fn list_sections(store: &dyn Store) -> Result<Vec<SectionWithAdviser>, ApiError> {
    Ok(store.list_sections().await?)
}

/// Creates a section and its student roster in a single write.
///
/// Every student's role is stamped with the new section's internal id. Nothing is written when
/// the adviser does not exist or any student fails validation.
#[instrument(skip(store, new), fields(id = %new.id, adviser = %new.adviser_id))]
pub async fn create_section(
    store: &dyn Store,
    new: NewSection,
    created_by: Option<Uuid>,
) -> Result<SectionWithAdviser, ApiError> {
    let id = new.id.trim().to_string();
    let name = new.name.trim().to_string();
    if id.is_empty() || name.is_empty() {
        return Err(ApiError::Validation("section id and name are required".into()));
    }

    let Some(adviser) = store.find_user_by_external_id(new.adviser_id.trim()).await? else {
        warn!(adviser = %new.adviser_id, "adviser not found");
        return Err(ApiError::AdviserNotFound);
    };

    let section = Section {
        internal_id: Uuid::new_v4(),
        id,
        name,
        adviser_id: adviser.internal_id,
        created_at: OffsetDateTime::now_utc(),
        created_by,
    };

    let enrolled = Role::Student { section_id: Some(section.internal_id) };
    let mut students = Vec::with_capacity(new.students.len());
    for mut input in new.students {
        if let Some(role) = input.role.take() {
            if role.kind != RoleType::Student {
                return Err(ApiError::Validation(format!(
                    "student {} must have role student",
                    input.id
                )));
            }
        }
        students.push(build_user(input, Some(enrolled.clone()), created_by)?);
    }

    store.insert_section(&section, &students).await?;
    info!(
        section_id = %section.internal_id,
        students = students.len(),
        "section created"
    );

    Ok(SectionWithAdviser { section, adviser: Some(adviser) })
}
