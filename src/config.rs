use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub ttl_days: i64,
}

impl SessionConfig {
    pub const MAX_TTL_DAYS: i64 = 3650;

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.cookie_name.trim().is_empty(), "SESSION_COOKIE_NAME must not be empty");
        anyhow::ensure!(
            (1..=Self::MAX_TTL_DAYS).contains(&self.ttl_days),
            "SESSION_TTL_DAYS must be between 1 and {}, got {}",
            Self::MAX_TTL_DAYS,
            self.ttl_days
        );
        Ok(())
    }
}

/// Credentials for the admin created at startup when no such user exists.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "rollcall".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "rollcall-users".into()),
        };
        anyhow::ensure!(!jwt.secret.is_empty(), "JWT_SECRET must not be empty");

        let session = SessionConfig {
            cookie_name: std::env::var("SESSION_COOKIE_NAME").unwrap_or_else(|_| "token".into()),
            cookie_secure: env_or("SESSION_COOKIE_SECURE", false),
            ttl_days: env_or("SESSION_TTL_DAYS", 365),
        };
        session.validate()?;

        let bootstrap_admin = match (
            std::env::var("BOOTSTRAP_ADMIN_EMAIL"),
            std::env::var("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => Some(BootstrapAdmin { email, password }),
            _ => None,
        };

        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 8080),
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            jwt,
            session,
            bootstrap_admin,
        })
    }

    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: None,
            db_max_connections: 1,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test".into(),
                audience: "test".into(),
            },
            session: SessionConfig {
                cookie_name: "token".into(),
                cookie_secure: false,
                ttl_days: 365,
            },
            bootstrap_admin: None,
        }
    }
}
