//! Connection handle for the Slotbook store.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};
use tracing::info;

use slotbook_core::db::{DatabaseError, open_pool, open_pool_in_memory};
use slotbook_core::time::from_millis;

/// Shared handle to the booking store.
///
/// Cloning is cheap (the pool is reference counted); one instance is opened at
/// startup and handed to both the ledger and the reminder dispatcher.
#[derive(Clone)]
pub struct BookingDatabase {
    pool: Pool<Sqlite>,
}

impl BookingDatabase {
    /// Open the store behind `url` and apply pending migrations.
    pub async fn open(url: &str) -> Result<Self, DatabaseError> {
        let pool = open_pool(url).await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open an in-memory store (for testing).
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        let pool = open_pool_in_memory().await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;

        info!("Booking database migrations complete");
        Ok(())
    }

    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Round-trip a trivial query and return the store's clock.
    pub async fn ping(&self) -> Result<DateTime<Utc>, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT CAST(strftime('%s', 'now') AS INTEGER) * 1000")
            .fetch_one(&self.pool)
            .await?;
        Ok(from_millis(row.0))
    }

    /// Wait for checked-out connections to be returned, then close the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Booking database closed");
    }
}
