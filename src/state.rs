use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    auth::{JwtKeys, SessionCookies},
    config::AppConfig,
    graphql::{build_schema, AppSchema},
    store::{MemoryStore, PgStore, Store},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub cookies: SessionCookies,
    pub schema: AppSchema,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match &config.database_url {
            Some(url) => {
                let pg = PgStore::connect(url, config.db_max_connections).await?;
                pg.migrate().await?;
                info!("using postgres store");
                Arc::new(pg) as Arc<dyn Store>
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory store, data is lost on exit");
                Arc::new(MemoryStore::new()) as Arc<dyn Store>
            }
        };

        Ok(Self::from_parts(config, store))
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn Store>) -> Self {
        let cookies = SessionCookies::new(&config.session);
        let keys = JwtKeys::new(&config.jwt, time::Duration::days(config.session.ttl_days));
        let schema = build_schema(store.clone(), keys, cookies.clone());
        Self {
            config,
            store,
            cookies,
            schema,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::from_parts(Arc::new(AppConfig::test()), Arc::new(MemoryStore::new()))
    }
}
