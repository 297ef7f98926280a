use async_graphql::{ComplexObject, Context, SimpleObject, ID};
use uuid::Uuid;

use super::repo_types::SectionWithAdviser;
use crate::{
    store::UserFilter,
    users::{
        dto::{format_timestamp, PublicUser},
        repo_types::RoleType,
    },
};

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "Section", complex)]
pub struct SectionView {
    #[graphql(skip)]
    pub section_uuid: Uuid,
    #[graphql(name = "_id")]
    pub internal_id: ID,
    pub id: String,
    pub name: String,
    pub adviser_id: ID,
    /// Null once the adviser has been removed.
    pub adviser: Option<PublicUser>,
    pub created_at: String,
    pub created_by: Option<ID>,
}

#[ComplexObject]
impl SectionView {
    /// Students whose role points at this section.
    async fn students(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<PublicUser>> {
        let filter = UserFilter {
            role_type: Some(RoleType::Student),
            section_id: Some(self.section_uuid),
            ..Default::default()
        };
        crate::graphql::list_users(ctx, &filter).await
    }
}

impl From<SectionWithAdviser> for SectionView {
    fn from(s: SectionWithAdviser) -> Self {
        let SectionWithAdviser { section, adviser } = s;
        Self {
            section_uuid: section.internal_id,
            internal_id: ID(section.internal_id.to_string()),
            id: section.id,
            name: section.name,
            adviser_id: ID(section.adviser_id.to_string()),
            adviser: adviser.map(PublicUser::from),
            created_at: format_timestamp(section.created_at),
            created_by: section.created_by.map(|id| ID(id.to_string())),
        }
    }
}
