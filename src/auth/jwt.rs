use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{
    config::JwtConfig,
    users::repo_types::{Role, User},
};

/// Session token payload: the caller's identity and role at login time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,      // internal user id
    pub uid: String,    // external user id
    pub email: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,     // matches the cookie max-age
    pub iss: String,
    pub aud: String,
}

/// Signing and verification keys, built once from config at startup.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(config: &JwtConfig, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl,
        }
    }

    pub fn sign(&self, user: &User) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let expires = now
            .checked_add(self.ttl)
            .ok_or_else(|| anyhow::anyhow!("session lifetime {} is out of range", self.ttl))?;
        let claims = SessionClaims {
            sub: user.internal_id,
            uid: user.id.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            iat: now.unix_timestamp() as usize,
            exp: expires.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user.internal_id, role = user.role.kind().as_str(), "session token signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<SessionClaims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "session token verified");
        Ok(data.claims)
    }
}
