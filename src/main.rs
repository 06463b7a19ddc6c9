use std::sync::Arc;

use tracing::{info, warn};
use user_api::{
    app, cache::CacheClient, config::AppConfig, db, mail::Mailer, state::AppState, telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(AppConfig::from_env()?);
    telemetry::init(&config.log);
    info!(name = %config.app.name, env = %config.app.env, "starting");

    let pool = db::connect(&config.database).await?;

    if let Err(e) = db::MIGRATOR.run(&pool).await {
        warn!(error = %e, "migration failed; continuing");
    }

    let cache = match &config.redis {
        Some(cfg) => match CacheClient::connect(cfg).await {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!(error = ?e, "redis unavailable, running without cache");
                None
            }
        },
        None => None,
    };

    let mailer = match &config.smtp {
        Some(cfg) => match Mailer::new(cfg) {
            Ok(mailer) => Some(mailer),
            Err(e) => {
                warn!(error = ?e, "smtp misconfigured, mail disabled");
                None
            }
        },
        None => None,
    };

    let state = AppState::new(config.clone(), pool.clone(), cache, mailer);
    app::serve(app::build_app(state), &config.app).await?;

    pool.close().await;
    info!("database pool closed");
    Ok(())
}
