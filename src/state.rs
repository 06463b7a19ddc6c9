use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    auth::{
        jwt::{JwtKeys, TokenService},
        password::{Argon2Hasher, CredentialHasher},
    },
    cache::CacheClient,
    config::{AppConfig, DatabaseConfig, JwtConfig, LogConfig, ServerConfig},
    mail::Mailer,
    users::{
        memory::MemoryUserStore,
        repo::{PgUserStore, UserStore},
        services::UserService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: UserService,
    pub tokens: Arc<dyn TokenService>,
    pub store: Arc<dyn UserStore>,
    pub cache: Option<CacheClient>,
    pub mailer: Option<Mailer>,
}

impl AppState {
    /// Production wiring: Postgres store, Argon2 hashing, HS256 tokens.
    pub fn new(
        config: Arc<AppConfig>,
        db: PgPool,
        cache: Option<CacheClient>,
        mailer: Option<Mailer>,
    ) -> Self {
        let store = Arc::new(PgUserStore::new(db)) as Arc<dyn UserStore>;
        Self::from_parts(config, store, Arc::new(Argon2Hasher), cache, mailer)
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
        cache: Option<CacheClient>,
        mailer: Option<Mailer>,
    ) -> Self {
        let tokens = Arc::new(JwtKeys::new(&config.jwt)) as Arc<dyn TokenService>;
        let users = UserService::new(store.clone(), hasher, tokens.clone());
        Self {
            config,
            users,
            tokens,
            store,
            cache,
            mailer,
        }
    }

    /// In-memory state for router tests; no database, cache or mail.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            app: ServerConfig {
                name: "user-api".into(),
                env: "test".into(),
                host: "127.0.0.1".into(),
                port: 0,
                debug: true,
                request_timeout_secs: 30,
            },
            database: DatabaseConfig {
                url: None,
                host: "localhost".into(),
                port: 5432,
                user: "postgres".into(),
                password: String::new(),
                name: "postgres".into(),
                ssl_mode: "disable".into(),
                timezone: "UTC".into(),
                max_connections: 1,
            },
            redis: None,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "user-api".into(),
                audience: "user-api-clients".into(),
                expire_hours: 1,
            },
            smtp: None,
            log: LogConfig {
                filter: "user_api=debug".into(),
                json: false,
            },
        });
        Self::from_parts(
            config,
            Arc::new(MemoryUserStore::new()),
            Arc::new(Argon2Hasher),
            None,
            None,
        )
    }
}
