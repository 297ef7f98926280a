use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo_types::User;

/// Section record in the store.
#[derive(Debug, Clone, FromRow)]
pub struct Section {
    pub internal_id: Uuid,
    #[sqlx(rename = "external_id")]
    pub id: String,
    pub name: String,
    pub adviser_id: Uuid,   // internal id of the adviser
    pub created_at: OffsetDateTime,
    pub created_by: Option<Uuid>,
}

/// A section joined with its adviser. The adviser is gone if it was removed by a bulk delete.
#[derive(Debug, Clone)]
pub struct SectionWithAdviser {
    pub section: Section,
    pub adviser: Option<User>,
}
