use tracing::warn;

use super::{
    jwt::{JwtKeys, SessionClaims},
    session::Session,
};
use crate::{error::ApiError, users::repo_types::RoleType};

pub const ADMIN_ONLY: &[RoleType] = &[RoleType::Admin];
pub const STAFF: &[RoleType] = &[RoleType::Admin, RoleType::SchoolAdmin];
pub const FACULTY: &[RoleType] = &[RoleType::Admin, RoleType::SchoolAdmin, RoleType::Teacher];
pub const SIGNED_IN: &[RoleType] = &[
    RoleType::Admin,
    RoleType::SchoolAdmin,
    RoleType::Teacher,
    RoleType::Student,
];

/// Single-shot role check, evaluated on every call.
///
/// No token is `Unauthorized`; a token that fails verification is `InvalidToken`; a valid token
/// whose role is outside `required` is `Unauthorized`.
pub fn authorize(
    session: &Session,
    keys: &JwtKeys,
    required: &[RoleType],
) -> Result<SessionClaims, ApiError> {
    let token = session.token().ok_or(ApiError::Unauthorized)?;
    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "session token rejected");
        ApiError::InvalidToken
    })?;

    let role = claims.role.kind();
    if required.contains(&role) {
        Ok(claims)
    } else {
        warn!(user_id = %claims.sub, role = role.as_str(), "role not permitted");
        Err(ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::JwtConfig,
        users::repo_types::{Role, User},
    };
    use time::{Duration, OffsetDateTime};
    use uuid::Uuid;

    fn keys() -> JwtKeys {
        JwtKeys::new(
            &JwtConfig { secret: "s".into(), issuer: "i".into(), audience: "a".into() },
            Duration::days(1),
        )
    }

    fn session_as(role: Role) -> Session {
        let user = User {
            internal_id: Uuid::new_v4(),
            id: "X".into(),
            first_name: "X".into(),
            last_name: "X".into(),
            middle_initial: None,
            email: "x@school.test".into(),
            password_hash: String::new(),
            role,
            created_at: OffsetDateTime::now_utc(),
            created_by: None,
        };
        Session::new(Some(keys().sign(&user).unwrap()))
    }

    #[test]
    fn missing_token_is_unauthorized() {
        let err = authorize(&Session::default(), &keys(), STAFF).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[test]
    fn garbage_token_is_invalid_token() {
        let session = Session::new(Some("garbage".into()));
        let err = authorize(&session, &keys(), STAFF).unwrap_err();
        assert!(matches!(err, ApiError::InvalidToken));
    }

    #[test]
    fn teacher_is_faculty_but_not_staff() {
        let session = session_as(Role::Teacher);
        assert!(authorize(&session, &keys(), FACULTY).is_ok());
        assert!(matches!(
            authorize(&session, &keys(), STAFF).unwrap_err(),
            ApiError::Unauthorized
        ));
    }

    #[test]
    fn only_admin_passes_admin_only() {
        assert!(authorize(&session_as(Role::Admin), &keys(), ADMIN_ONLY).is_ok());
        assert!(authorize(&session_as(Role::SchoolAdmin), &keys(), ADMIN_ONLY).is_err());
        assert!(authorize(&session_as(Role::Student { section_id: None }), &keys(), FACULTY).is_err());
    }
}
