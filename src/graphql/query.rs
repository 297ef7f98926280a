use async_graphql::{Context, ErrorExtensions, Object, Result, ID};

use super::{keys, list_users, protect, session, store};
use crate::{
    auth::{FACULTY, SIGNED_IN, STAFF},
    error::ApiError,
    sections::{dto::SectionView, services as section_services},
    store::UserFilter,
    users::dto::{parse_id, PublicUser, UserFilterInput},
};

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The signed-in user, or null for anonymous callers and invalid sessions.
    async fn me(&self, ctx: &Context<'_>) -> Result<Option<PublicUser>> {
        let Some(caller) = session(ctx).caller(keys(ctx).map_err(|e| e.extend())?) else {
            return Ok(None);
        };
        let user = store(ctx)
            .map_err(|e| e.extend())?
            .find_user(caller.sub)
            .await
            .map_err(|e| ApiError::from(e).extend())?;
        Ok(user.map(PublicUser::from))
    }

    /// Look up a user by internal id. Staff may read anyone; other roles only themselves.
    async fn user(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "_id")] internal_id: ID,
    ) -> Result<Option<PublicUser>> {
        let caller = protect(ctx, SIGNED_IN).map_err(|e| e.extend())?;
        let internal_id = parse_id(&internal_id, "_id").map_err(|e| e.extend())?;
        if caller.sub != internal_id && !STAFF.contains(&caller.role.kind()) {
            return Err(ApiError::Unauthorized.extend());
        }
        let user = store(ctx)
            .map_err(|e| e.extend())?
            .find_user(internal_id)
            .await
            .map_err(|e| ApiError::from(e).extend())?;
        Ok(user.map(PublicUser::from))
    }

    async fn users(
        &self,
        ctx: &Context<'_>,
        filter: Option<UserFilterInput>,
    ) -> Result<Vec<PublicUser>> {
        protect(ctx, STAFF).map_err(|e| e.extend())?;
        let filter = match filter {
            Some(f) => UserFilter::try_from(f).map_err(|e| e.extend())?,
            None => UserFilter::default(),
        };
        list_users(ctx, &filter).await
    }

    async fn sections(&self, ctx: &Context<'_>) -> Result<Vec<SectionView>> {
        protect(ctx, FACULTY).map_err(|e| e.extend())?;
        let list = section_services::list_sections(store(ctx).map_err(|e| e.extend())?)
            .await
            .map_err(|e| e.extend())?;
        Ok(list.into_iter().map(SectionView::from).collect())
    }
}
