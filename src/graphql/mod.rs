//! GraphQL schema.
//!
//! Resolvers are thin: they pull collaborators out of the context, run the role gate where
//! required, and delegate to the `users` / `sections` services. Every failure leaves here as a
//! GraphQL error with a `code` extension.

mod handlers;
mod mutation;
mod query;

use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, ErrorExtensions, Schema};

use crate::{
    auth::{authorize, JwtKeys, Session, SessionClaims, SessionCookies},
    error::ApiError,
    store::{Store, UserFilter},
    users::{dto::PublicUser, repo_types::RoleType, services},
};

pub use handlers::{graphiql, graphql_handler};
pub use mutation::MutationRoot;
pub use query::QueryRoot;

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the schema with the store, signing keys and cookie settings injected as context data.
/// The per-request [`Session`] is attached by the HTTP handler.
pub fn build_schema(store: Arc<dyn Store>, keys: JwtKeys, cookies: SessionCookies) -> AppSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(store)
        .data(keys)
        .data(cookies)
        .finish()
}

fn data<'a, T: std::any::Any + Send + Sync>(ctx: &Context<'a>) -> Result<&'a T, ApiError> {
    ctx.data::<T>().map_err(|e| {
        ApiError::Internal(anyhow::anyhow!(
            "missing context data {}: {}",
            std::any::type_name::<T>(),
            e.message
        ))
    })
}

pub(crate) fn store<'a>(ctx: &Context<'a>) -> Result<&'a dyn Store, ApiError> {
    data::<Arc<dyn Store>>(ctx).map(|s| s.as_ref())
}

pub(crate) fn keys<'a>(ctx: &Context<'a>) -> Result<&'a JwtKeys, ApiError> {
    data::<JwtKeys>(ctx)
}

pub(crate) fn cookies<'a>(ctx: &Context<'a>) -> Result<&'a SessionCookies, ApiError> {
    data::<SessionCookies>(ctx)
}

/// Requests without a session attached are anonymous.
pub(crate) fn session(ctx: &Context<'_>) -> Session {
    ctx.data_opt::<Session>().cloned().unwrap_or_default()
}

/// Authorization gate: returns the caller when their role is in `required`.
pub(crate) fn protect(ctx: &Context<'_>, required: &[RoleType]) -> Result<SessionClaims, ApiError> {
    authorize(&session(ctx), keys(ctx)?, required)
}

pub(crate) async fn list_users(
    ctx: &Context<'_>,
    filter: &UserFilter,
) -> async_graphql::Result<Vec<PublicUser>> {
    let users = services::find_users(store(ctx).map_err(|e| e.extend())?, filter)
        .await
        .map_err(|e| e.extend())?;
    Ok(users.into_iter().map(PublicUser::from).collect())
}

#[cfg(test)]
mod tests;
