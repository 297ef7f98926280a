use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{parse_id, UserInput},
    repo_types::{Role, RoleType, User},
};
use crate::{
    auth::{
        password::{check_policy, hash_password, verify_login},
        JwtKeys,
    },
    error::ApiError,
    store::{Store, UserFilter},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn required(value: &str, field: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Validates the input and turns it into a storable record with a hashed password.
///
/// A missing role defaults to `fallback_role`.
pub fn build_user(
    input: UserInput,
    fallback_role: Option<Role>,
    created_by: Option<Uuid>,
) -> Result<User, ApiError> {
    let email = input.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::Validation(format!("invalid email: {email}")));
    }
    check_policy(&input.password).map_err(ApiError::Validation)?;

    let middle_initial = input
        .middle_initial
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());
    if middle_initial.as_ref().is_some_and(|m| m.chars().count() > 1) {
        return Err(ApiError::Validation("middleInitial must be a single letter".into()));
    }

    let role = match (input.role, fallback_role) {
        (Some(r), _) => {
            let section_id = r.section_id.as_ref().map(|v| parse_id(v, "sectionId")).transpose()?;
            Role::from_parts(r.kind, section_id).map_err(ApiError::Validation)?
        }
        (None, Some(role)) => role,
        (None, None) => return Err(ApiError::Validation("role is required".into())),
    };

    Ok(User {
        internal_id: Uuid::new_v4(),
        id: required(&input.id, "id")?,
        first_name: required(&input.first_name, "firstName")?,
        last_name: required(&input.last_name, "lastName")?,
        middle_initial,
        email,
        password_hash: hash_password(&input.password)?,
        role,
        created_at: OffsetDateTime::now_utc(),
        created_by,
    })
}

#[instrument(skip(store, input), fields(id = %input.id))]
pub async fn create_user(
    store: &dyn Store,
    input: UserInput,
    created_by: Option<Uuid>,
) -> Result<User, ApiError> {
    let user = build_user(input, None, created_by)?;
    store.insert_users(std::slice::from_ref(&user)).await?;
    info!(user_id = %user.internal_id, role = user.role.kind().as_str(), "user created");
    Ok(user)
}

/// Validates every input first, then writes the batch in one all-or-nothing insert.
#[instrument(skip(store, inputs), fields(count = inputs.len()))]
pub async fn create_users(
    store: &dyn Store,
    inputs: Vec<UserInput>,
    created_by: Option<Uuid>,
) -> Result<Vec<User>, ApiError> {
    let users = inputs
        .into_iter()
        .map(|input| build_user(input, None, created_by))
        .collect::<Result<Vec<_>, _>>()?;
    store.insert_users(&users).await?;
    info!(count = users.len(), "users created");
    Ok(users)
}

#[instrument(skip(store))]
pub async fn find_users(store: &dyn Store, filter: &UserFilter) -> Result<Vec<User>, ApiError> {
    Ok(store.find_users(filter).await?)
}

/// Bulk removal of everyone except admins.
#[instrument(skip(store))]
pub async fn delete_non_admins(store: &dyn Store) -> Result<u64, ApiError> {
    let removed = store.delete_users_except(RoleType::Admin).await?;
    info!(removed, "non-admin users deleted");
    Ok(removed)
}

/// Checks credentials and signs a session token.
///
/// Unknown email and wrong password produce the same error.
#[instrument(skip(store, keys, password))]
pub async fn login(
    store: &dyn Store,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> Result<(User, String), ApiError> {
    let email = email.trim().to_lowercase();

    let found = store.find_user_by_email(&email).await?;
    let verified = verify_login(password, found.as_ref().map(|u| u.password_hash.as_str()))?;

    let user = match found {
        Some(user) if verified => user,
        Some(user) => {
            warn!(email = %email, user_id = %user.internal_id, "login invalid password");
            return Err(ApiError::InvalidCredentials);
        }
        None => {
            warn!(email = %email, "login unknown email");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let token = keys.sign(&user)?;
    info!(user_id = %user.internal_id, "user logged in");
    Ok((user, token))
}
