//! Database setup and initialization

use anyhow::{Context, Result};
use imgstash_core::Config;
use imgstash_db::{ImageRepository, PgImageRepository};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Upper bound for the delay between recovery attempts.
pub const MAX_RECOVERY_BACKOFF_SECS: u64 = 60;

/// Pool plus whether the startup connection succeeded.
pub struct DatabaseHandle {
    pub pool: PgPool,
    pub connected: bool,
}

fn pool_options(config: &Config) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
}

async fn run_migrations(pool: &PgPool) -> Result<()> {
    // Path: workspace migrations/ from crate root
    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    let migrator = sqlx::migrate::Migrator::new(migrations_dir)
        .await
        .context("Failed to load migrations")?;
    migrator
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    Ok(())
}

/// Connect to the database. A database that is down at startup does not stop
/// the process: the error is logged and a lazily-connecting pool is returned
/// so requests fail individually until the database comes back.
pub async fn setup_database(config: &Config) -> Result<DatabaseHandle> {
    tracing::info!("Connecting to database...");

    match pool_options(config).connect(&config.database_url).await {
        Ok(pool) => {
            tracing::info!(
                max_connections = config.db_max_connections,
                "Database connected successfully"
            );
            Ok(DatabaseHandle {
                pool,
                connected: true,
            })
        }
        Err(e) => {
            tracing::error!(error = %e, "Database connection failed; continuing in degraded mode");
            let pool = pool_options(config)
                .connect_lazy(&config.database_url)
                .context("Invalid DATABASE_URL")?;
            Ok(DatabaseHandle {
                pool,
                connected: false,
            })
        }
    }
}

/// Apply migrations, then normalize legacy records.
pub async fn prepare_schema(repository: &PgImageRepository) -> Result<()> {
    run_migrations(repository.pool()).await?;
    tracing::info!("Database migrations applied");

    let updated = repository
        .backfill_legacy()
        .await
        .context("Legacy record back-fill failed")?;
    tracing::info!(updated, "Legacy image records normalized");
    Ok(())
}

/// Delay before recovery attempt `attempt` (exponential with cap).
#[inline]
pub(crate) fn compute_recovery_backoff_seconds(attempt: u32) -> u64 {
    2_u64
        .checked_pow(attempt)
        .unwrap_or(u64::MAX)
        .min(MAX_RECOVERY_BACKOFF_SECS)
}

/// Keep retrying [`prepare_schema`] in the background until it succeeds.
///
/// The repository shares its lazy pool with the request path, so once the
/// database is reachable requests start working before this task finishes.
pub fn spawn_recovery(repository: Arc<PgImageRepository>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut attempt = 0u32;
        loop {
            let backoff_seconds = compute_recovery_backoff_seconds(attempt);
            tokio::time::sleep(Duration::from_secs(backoff_seconds)).await;
            attempt = attempt.saturating_add(1);

            match prepare_schema(&repository).await {
                Ok(()) => {
                    tracing::info!(attempt, "Database recovered from degraded mode");
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        error = ?e,
                        attempt,
                        retry_in_secs = compute_recovery_backoff_seconds(attempt),
                        "Database still unavailable"
                    );
                }
            }
        }
    })
}
