use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::config::{Config, DB_BUSY_TIMEOUT_SECS};
use crate::error::Result;

/// Transactional front of the auction database.
///
/// Every mutation of purses, player status, squads or rounds goes through
/// [`Ledger::with_transaction`]. The first statement of each transaction bumps
/// the ledger version, so the writer holds SQLite's write lock before it reads
/// any precondition. Concurrent writers therefore queue on the lock (bounded
/// by the busy timeout) instead of failing on a lock upgrade.
#[derive(Clone)]
pub struct Ledger {
    pool: SqlitePool,
    health: Arc<HealthState>,
    latency: Arc<LatencyStats>,
}

impl Ledger {
    pub async fn connect(cfg: &Config) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", cfg.db_path))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(DB_BUSY_TIMEOUT_SECS));
        let pool = SqlitePoolOptions::new()
            .max_connections(cfg.db_max_connections)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// Wraps an existing pool and applies pending migrations.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            pool,
            health: Arc::new(HealthState::new()),
            latency: Arc::new(LatencyStats::new()),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn health(&self) -> &Arc<HealthState> {
        &self.health
    }

    pub fn latency(&self) -> &Arc<LatencyStats> {
        &self.latency
    }

    /// Runs `f` inside one transaction. `Ok` commits; `Err` rolls back every
    /// write `f` made and is returned unchanged.
    ///
    /// `f` must only touch the connection it is given: the pool may have a
    /// single connection, which this transaction is holding.
    pub async fn with_transaction<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T>> + Send,
    {
        let started = Instant::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE ledger_state SET version = version + 1 WHERE id = 1")
            .execute(&mut *tx)
            .await?;

        match f(&mut *tx).await {
            Ok(value) => {
                tx.commit().await?;
                self.health.record_commit();
                self.latency.record(op, started.elapsed());
                debug!(op, elapsed_us = started.elapsed().as_micros() as u64, "ledger commit");
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(op, "rollback failed after {e}: {rollback_err}");
                }
                self.health.record_rollback();
                debug!(op, "ledger rollback: {e}");
                Err(e)
            }
        }
    }

    /// Number of committed mutations since the database was created.
    pub async fn version(&self) -> Result<i64> {
        let version: i64 = sqlx::query_scalar("SELECT version FROM ledger_state WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }

    /// Fresh in-memory database with migrations applied. One connection, kept
    /// alive for the pool's lifetime.
    #[cfg(test)]
    pub async fn in_memory() -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .unwrap();
        Self::from_pool(pool).await.unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[tokio::test]
    async fn commit_bumps_version() {
        let ledger = Ledger::in_memory().await;
        assert_eq!(ledger.version().await.unwrap(), 0);

        ledger
            .with_transaction("noop", |_conn| Box::pin(async { Ok::<(), AppError>(()) }))
            .await
            .unwrap();

        assert_eq!(ledger.version().await.unwrap(), 1);
        assert_eq!(ledger.health().committed(), 1);
    }

    #[tokio::test]
    async fn error_rolls_back_every_write() {
        let ledger = Ledger::in_memory().await;

        let result: Result<()> = ledger
            .with_transaction("failing", |conn| {
                Box::pin(async move {
                    sqlx::query(
                        "INSERT INTO teams (name, short_code, purse_start, purse_remaining, created_at, updated_at)
                         VALUES ('Chennai', 'CSK', 9000, 9000, 0, 0)",
                    )
                    .execute(&mut *conn)
                    .await?;
                    Err::<(), _>(AppError::conflict("abort"))
                })
            })
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let teams: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teams")
            .fetch_one(ledger.pool())
            .await
            .unwrap();
        assert_eq!(teams, 0);
        assert_eq!(ledger.version().await.unwrap(), 0);
        assert_eq!(ledger.health().rolled_back(), 1);
    }
}
