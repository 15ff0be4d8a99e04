use chrono::Utc;

use bay_types::{BayError, Result, SessionShip};

use crate::Database;

type SessionShipRow = (
    String,
    String,
    String,
    chrono::DateTime<Utc>,
    chrono::DateTime<Utc>,
);

fn row_to_session_ship(row: SessionShipRow) -> SessionShip {
    let (id, session_id, ship_id, created_at, last_activity) = row;
    SessionShip {
        id,
        session_id,
        ship_id,
        created_at,
        last_activity,
    }
}

/// Repository for the `session_ships` table — the binding between a caller's
/// session id and the Ship it has been assigned.
pub struct SessionShipRepository<'a> {
    db: &'a Database,
}

impl<'a> SessionShipRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, binding: &SessionShip) -> Result<()> {
        sqlx::query(
            "INSERT INTO session_ships (id, session_id, ship_id, created_at, last_activity)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&binding.id)
        .bind(&binding.session_id)
        .bind(&binding.ship_id)
        .bind(binding.created_at)
        .bind(binding.last_activity)
        .execute(self.db.pool())
        .await
        .map_err(|e| BayError::Store(format!("Create session_ship: {e}")))?;

        Ok(())
    }

    /// The Ship already bound to `session_id`, if any — used to make Ship
    /// reuse idempotent per-session.
    pub async fn get_for_session(&self, session_id: &str) -> Result<Option<SessionShip>> {
        let row: Option<SessionShipRow> = sqlx::query_as(
            "SELECT id, session_id, ship_id, created_at, last_activity
             FROM session_ships WHERE session_id = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(session_id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| BayError::Store(format!("Get session_ship for session: {e}")))?;

        Ok(row.map(row_to_session_ship))
    }

    /// The exact `(session_id, ship_id)` binding, if it exists — the
    /// affinity check used to gate operation and upload forwarding.
    pub async fn get(&self, session_id: &str, ship_id: &str) -> Result<Option<SessionShip>> {
        let row: Option<SessionShipRow> = sqlx::query_as(
            "SELECT id, session_id, ship_id, created_at, last_activity
             FROM session_ships WHERE session_id = ? AND ship_id = ?",
        )
        .bind(session_id)
        .bind(ship_id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| BayError::Store(format!("Get session_ship: {e}")))?;

        Ok(row.map(row_to_session_ship))
    }

    pub async fn list_for_ship(&self, ship_id: &str) -> Result<Vec<SessionShip>> {
        let rows: Vec<SessionShipRow> = sqlx::query_as(
            "SELECT id, session_id, ship_id, created_at, last_activity
             FROM session_ships WHERE ship_id = ? ORDER BY created_at ASC",
        )
        .bind(ship_id)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| BayError::Store(format!("List session_ships for ship: {e}")))?;

        Ok(rows.into_iter().map(row_to_session_ship).collect())
    }

    /// Bump `last_activity` for the binding `(session_id, ship_id)`. A no-op
    /// if the binding doesn't exist — callers are expected to have already
    /// verified it via [`Self::get`].
    pub async fn update_activity(&self, session_id: &str, ship_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE session_ships SET last_activity = ? WHERE session_id = ? AND ship_id = ?",
        )
        .bind(Utc::now())
        .bind(session_id)
        .bind(ship_id)
        .execute(self.db.pool())
        .await
        .map_err(|e| BayError::Store(format!("Touch session_ship activity: {e}")))?;

        Ok(())
    }
}
