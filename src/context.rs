/// Application context and dependency injection
use crate::{
    account::AccountManager,
    admin::AdminManager,
    cache::CacheManager,
    config::ServerConfig,
    content::ContentManager,
    db::{DatabaseAdapter, DatabaseManager, DatabaseOptions},
    error::WikiResult,
    rate_limit::RateLimiter,
    search::SearchEngine,
};
use std::sync::Arc;
use std::time::Duration;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: Arc<dyn DatabaseAdapter>,
    pub cache: Arc<CacheManager>,
    pub accounts: Arc<AccountManager>,
    pub content: Arc<ContentManager>,
    pub search: Arc<SearchEngine>,
    pub admin: Arc<AdminManager>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> WikiResult<Self> {
        config.validate()?;

        let db = DatabaseManager::connect(
            &config.database.url,
            DatabaseOptions {
                max_connections: config.database.max_connections,
                ..DatabaseOptions::default()
            },
        )
        .await?;

        let cache = Arc::new(CacheManager::connect(&config.cache).await);
        tracing::info!("✓ Cache ready ({})", cache.backend_name());

        Ok(Self::from_parts(config, db, cache))
    }

    /// Wire the services around an already opened database and cache
    pub fn from_parts(
        config: ServerConfig,
        db: Arc<dyn DatabaseAdapter>,
        cache: Arc<CacheManager>,
    ) -> Self {
        let config = Arc::new(config);

        let accounts = Arc::new(AccountManager::new(db.clone(), config.clone()));
        let content = Arc::new(ContentManager::new(db.clone(), cache.clone()));
        let search = Arc::new(SearchEngine::new(
            db.clone(),
            cache.clone(),
            Duration::from_secs(config.cache.search_ttl),
        ));
        let admin = Arc::new(AdminManager::new(db.clone(), config.clone()));
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        Self {
            config,
            db,
            cache,
            accounts,
            content,
            search,
            admin,
            rate_limiter,
        }
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
