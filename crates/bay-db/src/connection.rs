use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use bay_types::{BayError, Result};

/// Async SQLite database connection manager.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection from a `sqlite://` URL (or bare
    /// file path — sqlx accepts both).
    pub async fn new(database_url: &str) -> Result<Self> {
        let opts: SqliteConnectOptions = database_url
            .parse()
            .map_err(|e| BayError::Store(format!("Invalid DATABASE_URL: {e}")))?;

        let opts = opts
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_millis(5000))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(|e| BayError::Store(format!("Failed to connect: {e}")))?;

        Ok(Self { pool })
    }

    /// Create a new in-memory database (for testing).
    pub async fn in_memory() -> Result<Self> {
        let opts = SqliteConnectOptions::new()
            .filename(":memory:")
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .map_err(|e| BayError::Store(format!("Failed to connect: {e}")))?;

        Ok(Self { pool })
    }

    /// Create the `ships` and `session_ships` tables if they don't exist.
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS ships (
                id TEXT PRIMARY KEY,
                status INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                container_id TEXT,
                ip_address TEXT,
                ttl INTEGER NOT NULL,
                max_session_num INTEGER NOT NULL,
                current_session_num INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| BayError::Store(format!("Create ships table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_ships_status ON ships(status)")
            .execute(&self.pool)
            .await
            .map_err(|e| BayError::Store(format!("Create ships status index: {e}")))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS session_ships (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                ship_id TEXT NOT NULL REFERENCES ships(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                last_activity TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| BayError::Store(format!("Create session_ships table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_session_ships_session
             ON session_ships(session_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| BayError::Store(format!("Create session_ships session index: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_session_ships_ship
             ON session_ships(ship_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| BayError::Store(format!("Create session_ships ship index: {e}")))?;

        info!("Database schema initialized (2 tables, 3 indexes)");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn database_initialize() {
        let db = Database::in_memory().await.unwrap();
        db.initialize().await.unwrap();

        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ships")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(row.0, 0);

        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM session_ships")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(row.0, 0);
    }
}
