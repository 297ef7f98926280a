use async_graphql::{Context, ErrorExtensions, Object, Result};
use tracing::debug;

use super::{cookies, keys, protect, session, store};
use crate::{
    auth::{ADMIN_ONLY, STAFF},
    sections::{
        dto::SectionView,
        services::{self as section_services, NewSection},
    },
    users::{
        dto::{PublicUser, UserInput},
        services as user_services,
    },
};

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn add_user(&self, ctx: &Context<'_>, user: UserInput) -> Result<PublicUser> {
        let caller = protect(ctx, STAFF).map_err(|e| e.extend())?;
        let created = user_services::create_user(
            store(ctx).map_err(|e| e.extend())?,
            user,
            Some(caller.sub),
        )
        .await
        .map_err(|e| e.extend())?;
        Ok(PublicUser::from(created))
    }

    /// Creates the whole batch or none of it.
    async fn add_users(&self, ctx: &Context<'_>, users: Vec<UserInput>) -> Result<Vec<PublicUser>> {
        let caller = protect(ctx, STAFF).map_err(|e| e.extend())?;
        let created = user_services::create_users(
            store(ctx).map_err(|e| e.extend())?,
            users,
            Some(caller.sub),
        )
        .await
        .map_err(|e| e.extend())?;
        Ok(created.into_iter().map(PublicUser::from).collect())
    }

    /// Removes every user that is not an admin. Returns how many were removed.
    async fn delete_users(&self, ctx: &Context<'_>) -> Result<u64> {
        protect(ctx, ADMIN_ONLY).map_err(|e| e.extend())?;
        user_services::delete_non_admins(store(ctx).map_err(|e| e.extend())?)
            .await
            .map_err(|e| e.extend())
    }

    async fn add_section(
        &self,
        ctx: &Context<'_>,
        id: String,
        name: String,
        adviser_id: String,
        #[graphql(default)] students: Vec<UserInput>,
    ) -> Result<SectionView> {
        let caller = protect(ctx, STAFF).map_err(|e| e.extend())?;
        let new = NewSection { id, name, adviser_id, students };
        let created = section_services::create_section(
            store(ctx).map_err(|e| e.extend())?,
            new,
            Some(caller.sub),
        )
        .await
        .map_err(|e| e.extend())?;
        Ok(SectionView::from(created))
    }

    /// Sets the session cookie on success.
    async fn login(&self, ctx: &Context<'_>, email: String, password: String) -> Result<PublicUser> {
        let (user, token) = user_services::login(
            store(ctx).map_err(|e| e.extend())?,
            keys(ctx).map_err(|e| e.extend())?,
            &email,
            &password,
        )
        .await
        .map_err(|e| e.extend())?;

        let cookie = cookies(ctx).map_err(|e| e.extend())?.session_cookie(token);
        ctx.append_http_header("set-cookie", cookie.to_string());
        Ok(PublicUser::from(user))
    }

    /// Clears the session cookie. Without a session this does nothing.
    async fn logout(&self, ctx: &Context<'_>) -> Result<bool> {
        if session(ctx).token().is_none() {
            debug!("logout without session");
            return Ok(true);
        }
        let cookie = cookies(ctx).map_err(|e| e.extend())?.expired_cookie();
        ctx.append_http_header("set-cookie", cookie.to_string());
        Ok(true)
    }
}
