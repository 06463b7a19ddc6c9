use std::{str::FromStr, time::Duration};

use anyhow::Context;
use sqlx::{
    migrate::Migrator,
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool,
};
use tracing::info;

use crate::config::DatabaseConfig;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub fn connect_options(cfg: &DatabaseConfig) -> anyhow::Result<PgConnectOptions> {
    if let Some(url) = &cfg.url {
        return PgConnectOptions::from_str(url).context("invalid DATABASE_URL");
    }
    let ssl_mode = PgSslMode::from_str(&cfg.ssl_mode)
        .with_context(|| format!("invalid DB_SSLMODE {:?}", cfg.ssl_mode))?;
    Ok(PgConnectOptions::new()
        .host(&cfg.host)
        .port(cfg.port)
        .username(&cfg.user)
        .password(&cfg.password)
        .database(&cfg.name)
        .ssl_mode(ssl_mode)
        .options([("timezone", cfg.timezone.as_str())]))
}

pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(connect_options(cfg)?)
        .await
        .context("connect to database")?;
    info!(max_connections = cfg.max_connections, "database connected");
    Ok(pool)
}
