use chrono::{DateTime, Utc};

use bay_types::{BayError, Result, Ship, ShipStatus};

use crate::Database;

type ShipRow = (
    String,
    i64,
    DateTime<Utc>,
    DateTime<Utc>,
    Option<String>,
    Option<String>,
    i64,
    i64,
    i64,
);

fn row_to_ship(row: ShipRow) -> Result<Ship> {
    let (
        id,
        status,
        created_at,
        updated_at,
        container_id,
        ip_address,
        ttl,
        max_session_num,
        current_session_num,
    ) = row;

    Ok(Ship {
        id,
        status: ShipStatus::try_from(status).map_err(BayError::Store)?,
        created_at,
        updated_at,
        container_id,
        ip_address,
        ttl,
        max_session_num,
        current_session_num,
    })
}

/// Repository for the `ships` table.
pub struct ShipRepository<'a> {
    db: &'a Database,
}

impl<'a> ShipRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, ship: &Ship) -> Result<()> {
        sqlx::query(
            "INSERT INTO ships
                (id, status, created_at, updated_at, container_id, ip_address,
                 ttl, max_session_num, current_session_num)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&ship.id)
        .bind(i64::from(ship.status))
        .bind(ship.created_at)
        .bind(ship.updated_at)
        .bind(&ship.container_id)
        .bind(&ship.ip_address)
        .bind(ship.ttl)
        .bind(ship.max_session_num)
        .bind(ship.current_session_num)
        .execute(self.db.pool())
        .await
        .map_err(|e| BayError::Store(format!("Create ship: {e}")))?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Ship>> {
        let row: Option<ShipRow> = sqlx::query_as(
            "SELECT id, status, created_at, updated_at, container_id, ip_address,
                    ttl, max_session_num, current_session_num
             FROM ships WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| BayError::Store(format!("Get ship: {e}")))?;

        row.map(row_to_ship).transpose()
    }

    /// Persist every field of `ship` and bump `updated_at` to now.
    pub async fn update(&self, ship: &Ship) -> Result<()> {
        let updated_at = Utc::now();
        sqlx::query(
            "UPDATE ships SET
                status = ?, updated_at = ?, container_id = ?, ip_address = ?,
                ttl = ?, max_session_num = ?, current_session_num = ?
             WHERE id = ?",
        )
        .bind(i64::from(ship.status))
        .bind(updated_at)
        .bind(&ship.container_id)
        .bind(&ship.ip_address)
        .bind(ship.ttl)
        .bind(ship.max_session_num)
        .bind(ship.current_session_num)
        .bind(&ship.id)
        .execute(self.db.pool())
        .await
        .map_err(|e| BayError::Store(format!("Update ship: {e}")))?;

        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM ships WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await
            .map_err(|e| BayError::Store(format!("Delete ship: {e}")))?;

        Ok(())
    }

    /// All Ships currently `Running`, ordered by creation time.
    pub async fn list_active(&self) -> Result<Vec<Ship>> {
        let rows: Vec<ShipRow> = sqlx::query_as(
            "SELECT id, status, created_at, updated_at, container_id, ip_address,
                    ttl, max_session_num, current_session_num
             FROM ships WHERE status = 1 ORDER BY created_at ASC",
        )
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| BayError::Store(format!("List active ships: {e}")))?;

        rows.into_iter().map(row_to_ship).collect()
    }

    pub async fn count_active(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ships WHERE status = 1")
            .fetch_one(self.db.pool())
            .await
            .map_err(|e| BayError::Store(format!("Count active ships: {e}")))?;

        Ok(row.0)
    }

    /// First `Running` Ship with a free session slot, if any.
    pub async fn find_available(&self) -> Result<Option<Ship>> {
        let row: Option<ShipRow> = sqlx::query_as(
            "SELECT id, status, created_at, updated_at, container_id, ip_address,
                    ttl, max_session_num, current_session_num
             FROM ships
             WHERE status = 1 AND current_session_num < max_session_num
             ORDER BY created_at ASC
             LIMIT 1",
        )
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| BayError::Store(format!("Find available ship: {e}")))?;

        row.map(row_to_ship).transpose()
    }

    /// Bumps `current_session_num` by 1, but only on a row that still has a
    /// free slot — a no-op on an already-full Ship, keeping the
    /// `[0, max_session_num]` invariant regardless of the caller.
    pub async fn increment_session_count(&self, id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE ships SET current_session_num = current_session_num + 1, updated_at = ?
             WHERE id = ? AND current_session_num < max_session_num",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(self.db.pool())
        .await
        .map_err(|e| BayError::Store(format!("Increment ship session count: {e}")))?;

        Ok(())
    }

    pub async fn decrement_session_count(&self, id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE ships SET current_session_num = MAX(current_session_num - 1, 0), updated_at = ?
             WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(self.db.pool())
        .await
        .map_err(|e| BayError::Store(format!("Decrement ship session count: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> Database {
        let db = Database::in_memory().await.unwrap();
        db.initialize().await.unwrap();
        db
    }

    #[tokio::test]
    async fn create_and_get_roundtrip() {
        let db = setup().await;
        let repo = ShipRepository::new(&db);

        let ship = Ship::new(600, 2);
        repo.create(&ship).await.unwrap();

        let fetched = repo.get(&ship.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, ship.id);
        assert_eq!(fetched.status, ShipStatus::Running);
        assert_eq!(fetched.max_session_num, 2);
        assert_eq!(fetched.current_session_num, 0);
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let db = setup().await;
        let repo = ShipRepository::new(&db);
        assert!(repo.get("does-not-exist").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_persists_container_fields() {
        let db = setup().await;
        let repo = ShipRepository::new(&db);

        let mut ship = Ship::new(600, 1);
        repo.create(&ship).await.unwrap();

        ship.container_id = Some("abc123".to_string());
        ship.ip_address = Some("172.18.0.5".to_string());
        repo.update(&ship).await.unwrap();

        let fetched = repo.get(&ship.id).await.unwrap().unwrap();
        assert_eq!(fetched.container_id.as_deref(), Some("abc123"));
        assert_eq!(fetched.ip_address.as_deref(), Some("172.18.0.5"));
    }

    #[tokio::test]
    async fn stopping_a_ship_removes_it_from_active_list_but_not_from_store() {
        let db = setup().await;
        let repo = ShipRepository::new(&db);

        let mut ship = Ship::new(600, 1);
        repo.create(&ship).await.unwrap();
        assert_eq!(repo.count_active().await.unwrap(), 1);

        ship.status = ShipStatus::Stopped;
        repo.update(&ship).await.unwrap();

        assert_eq!(repo.count_active().await.unwrap(), 0);
        assert!(repo.get(&ship.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn find_available_skips_full_ships() {
        let db = setup().await;
        let repo = ShipRepository::new(&db);

        let mut full = Ship::new(600, 1);
        full.current_session_num = 1;
        repo.create(&full).await.unwrap();

        let spare = Ship::new(600, 2);
        repo.create(&spare).await.unwrap();

        let available = repo.find_available().await.unwrap().unwrap();
        assert_eq!(available.id, spare.id);
    }

    #[tokio::test]
    async fn increment_and_decrement_session_count() {
        let db = setup().await;
        let repo = ShipRepository::new(&db);

        let ship = Ship::new(600, 3);
        repo.create(&ship).await.unwrap();

        repo.increment_session_count(&ship.id).await.unwrap();
        repo.increment_session_count(&ship.id).await.unwrap();
        let fetched = repo.get(&ship.id).await.unwrap().unwrap();
        assert_eq!(fetched.current_session_num, 2);

        repo.decrement_session_count(&ship.id).await.unwrap();
        let fetched = repo.get(&ship.id).await.unwrap().unwrap();
        assert_eq!(fetched.current_session_num, 1);
    }

    #[tokio::test]
    async fn decrement_does_not_go_below_zero() {
        let db = setup().await;
        let repo = ShipRepository::new(&db);

        let ship = Ship::new(600, 1);
        repo.create(&ship).await.unwrap();

        repo.decrement_session_count(&ship.id).await.unwrap();
        let fetched = repo.get(&ship.id).await.unwrap().unwrap();
        assert_eq!(fetched.current_session_num, 0);
    }

    #[tokio::test]
    async fn increment_does_not_exceed_max_session_num() {
        let db = setup().await;
        let repo = ShipRepository::new(&db);

        let mut ship = Ship::new(600, 1);
        ship.current_session_num = 1;
        repo.create(&ship).await.unwrap();

        repo.increment_session_count(&ship.id).await.unwrap();
        let fetched = repo.get(&ship.id).await.unwrap().unwrap();
        assert_eq!(fetched.current_session_num, 1);
    }
}
