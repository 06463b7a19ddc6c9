use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use tracing::info;
use user_api::{config::AppConfig, db, telemetry};

#[derive(Parser)]
#[command(name = "migrate", about = "Apply or revert database migrations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply every pending migration.
    Up,
    /// Revert the most recent migrations.
    Down {
        #[arg(long, default_value_t = 1)]
        steps: usize,
    },
    /// Print the latest applied version.
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    telemetry::init(&config.log);
    let pool = db::connect(&config.database).await?;

    match cli.command {
        Command::Up => {
            db::MIGRATOR.run(&pool).await.context("apply migrations")?;
            info!("migrations applied");
        }
        Command::Down { steps } => revert(&pool, steps).await?,
        Command::Version => match applied_versions(&pool).await?.first() {
            Some(version) => println!("{version}"),
            None => println!("no migrations applied"),
        },
    }

    pool.close().await;
    Ok(())
}

/// Applied versions, newest first.
async fn applied_versions(pool: &PgPool) -> anyhow::Result<Vec<i64>> {
    let exists: bool = sqlx::query_scalar("SELECT to_regclass('_sqlx_migrations') IS NOT NULL")
        .fetch_one(pool)
        .await?;
    if !exists {
        return Ok(Vec::new());
    }
    let versions = sqlx::query_scalar(
        "SELECT version FROM _sqlx_migrations WHERE success ORDER BY version DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(versions)
}

async fn revert(pool: &PgPool, steps: usize) -> anyhow::Result<()> {
    if steps == 0 {
        bail!("--steps must be at least 1");
    }
    let applied = applied_versions(pool).await?;
    let Some(&target) = applied.get(steps) else {
        // Reverting as many steps as are applied, or more, empties the schema.
        db::MIGRATOR.undo(pool, 0).await.context("revert migrations")?;
        info!(reverted = applied.len(), "all migrations reverted");
        return Ok(());
    };
    db::MIGRATOR
        .undo(pool, target)
        .await
        .context("revert migrations")?;
    info!(reverted = steps, version = target, "migrations reverted");
    Ok(())
}
