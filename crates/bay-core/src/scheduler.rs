use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use bay_db::{Database, ShipRepository};
use bay_types::{BayError, Result, ShipStatus};

use crate::container_driver::ContainerDriver;

/// Schedules TTL expiry for Ships. Each `touch` call bumps a per-ship epoch
/// counter; when a timer fires it checks its own epoch is still current
/// before acting, so rescheduling a ship's TTL (via extend-ttl, or a new
/// session bind) silently supersedes any in-flight timer instead of racing it.
pub struct Scheduler {
    db: Arc<Database>,
    driver: Arc<dyn ContainerDriver>,
    epochs: Arc<Mutex<HashMap<String, u64>>>,
}

impl Scheduler {
    pub fn new(db: Arc<Database>, driver: Arc<dyn ContainerDriver>) -> Self {
        Self {
            db,
            driver,
            epochs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// (Re)schedule TTL expiry for `ship_id`, `ttl` seconds from now.
    /// Supersedes any previously scheduled timer for this ship.
    pub async fn schedule_ttl(&self, ship_id: String, ttl: i64) {
        let epoch = {
            let mut epochs = self.epochs.lock().await;
            let entry = epochs.entry(ship_id.clone()).or_insert(0);
            *entry += 1;
            *entry
        };

        let db = self.db.clone();
        let driver = self.driver.clone();
        let epochs = self.epochs.clone();
        let ttl = ttl.max(0) as u64;

        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(ttl)).await;

            let current_epoch = {
                let epochs = epochs.lock().await;
                epochs.get(&ship_id).copied().unwrap_or(0)
            };

            if current_epoch != epoch {
                debug!(ship_id, "ttl timer superseded, skipping expiry");
                return;
            }

            if let Err(e) = expire_ship(&db, driver.as_ref(), &ship_id).await {
                warn!(ship_id, error = %e, "failed to expire ship");
            }
        });
    }
}

/// Stop the container and mark the Ship `Stopped`. The row is never deleted
/// — it stays queryable (status 0) so callers can still see it existed.
async fn expire_ship(
    db: &Database,
    driver: &dyn ContainerDriver,
    ship_id: &str,
) -> Result<()> {
    let repo = ShipRepository::new(db);
    let Some(mut ship) = repo.get(ship_id).await? else {
        return Ok(());
    };

    if ship.status != ShipStatus::Running {
        return Ok(());
    }

    if let Some(container_id) = ship.container_id.clone() {
        driver.stop(&container_id).await?;
    }

    ship.status = ShipStatus::Stopped;
    repo.update(&ship).await?;
    info!(ship_id, "ship ttl expired, stopped");

    Ok(())
}

#[allow(dead_code)]
fn _assert_send_sync<T: Send + Sync>() {}
