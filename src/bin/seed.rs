use std::sync::Arc;

use tracing::{info, warn};
use user_api::{
    auth::password::Argon2Hasher, config::AppConfig, db, seed, telemetry,
    users::repo::PgUserStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    telemetry::init(&config.log);
    let pool = db::connect(&config.database).await?;

    if let Err(e) = db::MIGRATOR.run(&pool).await {
        warn!(error = %e, "migration failed; seeding anyway");
    }

    let store = PgUserStore::new(pool.clone());
    let report = seed::seed_users(&store, Arc::new(Argon2Hasher)).await?;
    info!(created = report.created, skipped = report.skipped, "seeding completed");

    pool.close().await;
    Ok(())
}
