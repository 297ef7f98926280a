use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;

use super::jwt::{JwtKeys, SessionClaims};
use crate::config::SessionConfig;

/// The raw session token a request arrived with, if any.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    pub fn from_jar(jar: &CookieJar, cookie_name: &str) -> Self {
        Self::new(jar.get(cookie_name).map(|c| c.value().to_string()))
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Caller identity; an invalid token counts as anonymous.
    pub fn caller(&self, keys: &JwtKeys) -> Option<SessionClaims> {
        let token = self.token()?;
        match keys.verify(token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                debug!(error = %e, "ignoring invalid session token");
                None
            }
        }
    }
}

/// Builds the `Set-Cookie` values for login and logout.
#[derive(Debug, Clone)]
pub struct SessionCookies {
    name: String,
    secure: bool,
    max_age: time::Duration,
}

impl SessionCookies {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            name: config.cookie_name.clone(),
            secure: config.cookie_secure,
            max_age: time::Duration::days(config.ttl_days),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((self.name.clone(), token))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(self.max_age)
            .build()
    }

    pub fn expired_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build((self.name.clone(), ""))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .build();
        cookie.make_removal();
        cookie
    }
}
