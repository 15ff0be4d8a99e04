use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use bay_config::{BehaviorAfterMax, Config};
use bay_db::{Database, ShipRepository, SessionShipRepository};
use bay_types::{
    BayError, CreateShipRequest, ExecResponse, Result, Ship, ShipSpec, SessionShip, UploadResponse,
};

use crate::container_driver::{ContainerDriver, ContainerSpec};
use crate::forwarder::Forwarder;
use crate::readiness::ReadinessProbe;
use crate::scheduler::Scheduler;

const CAPACITY_WAIT_POLL: Duration = Duration::from_secs(5);
const CAPACITY_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Coordinates Ship provisioning and reuse for a given session.
///
/// Every `get_or_create_ship` call is serialized through `admission`: the
/// reuse-check, capacity-check and row-insert happen as one atomic decision
/// from the caller's point of view, avoiding a TOCTOU race where two
/// concurrent requests both observe spare capacity and both provision.
pub struct Allocator {
    db: Arc<Database>,
    driver: Arc<dyn ContainerDriver>,
    forwarder: Arc<Forwarder>,
    readiness: Arc<dyn ReadinessProbe>,
    scheduler: Arc<Scheduler>,
    config: Arc<Config>,
    admission: Mutex<()>,
}

impl Allocator {
    pub fn new(
        db: Arc<Database>,
        driver: Arc<dyn ContainerDriver>,
        forwarder: Arc<Forwarder>,
        readiness: Arc<dyn ReadinessProbe>,
        scheduler: Arc<Scheduler>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            db,
            driver,
            forwarder,
            readiness,
            scheduler,
            config,
            admission: Mutex::new(()),
        }
    }

    /// Returns an existing Ship already bound to `session_id` if one exists,
    /// otherwise allocates one — reusing a Ship with a free slot or
    /// provisioning a fresh one, subject to `max_ship_num`.
    pub async fn get_or_create_ship(
        &self,
        session_id: &str,
        req: CreateShipRequest,
    ) -> Result<Ship> {
        let _guard = self.admission.lock().await;

        let bindings = SessionShipRepository::new(&self.db);
        let ships = ShipRepository::new(&self.db);

        if let Some(binding) = bindings.get_for_session(session_id).await? {
            if let Some(ship) = ships.get(&binding.ship_id).await? {
                if ship.is_running() {
                    bindings.update_activity(session_id, &ship.id).await?;
                    return Ok(ship);
                }
            }
        }

        let ship = self.acquire_slot(&ships, &req).await?;

        let binding = SessionShip::new(session_id, ship.id.clone());
        bindings.create(&binding).await?;
        ships.increment_session_count(&ship.id).await?;
        self.scheduler.schedule_ttl(ship.id.clone(), ship.ttl).await;

        let mut ship = ship;
        ship.current_session_num += 1;
        Ok(ship)
    }

    /// Find a reusable Ship or provision a new one, honoring
    /// `max_ship_num`/`behavior_after_max_ship` when the pool is full.
    async fn acquire_slot(&self, ships: &ShipRepository<'_>, req: &CreateShipRequest) -> Result<Ship> {
        loop {
            if let Some(ship) = ships.find_available().await? {
                return Ok(ship);
            }

            let active = ships.count_active().await?;
            if (active as u64) < self.config.max_ship_num as u64 {
                return self.provision(ships, req).await;
            }

            match self.config.behavior_after_max_ship {
                BehaviorAfterMax::Reject => return Err(BayError::CapacityExceeded),
                BehaviorAfterMax::Wait => {
                    // fall through to the wait loop below
                }
            }

            return self.wait_for_slot(ships, req).await;
        }
    }

    async fn wait_for_slot(&self, ships: &ShipRepository<'_>, req: &CreateShipRequest) -> Result<Ship> {
        let deadline = tokio::time::Instant::now() + CAPACITY_WAIT_TIMEOUT;

        loop {
            if let Some(ship) = ships.find_available().await? {
                return Ok(ship);
            }

            let active = ships.count_active().await?;
            if (active as u64) < self.config.max_ship_num as u64 {
                return self.provision(ships, req).await;
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(BayError::CapacityTimeout);
            }

            tokio::time::sleep(CAPACITY_WAIT_POLL).await;
        }
    }

    async fn provision(&self, ships: &ShipRepository<'_>, req: &CreateShipRequest) -> Result<Ship> {
        let spec = req.spec.clone().unwrap_or_default();
        let ShipSpec { cpus, memory } = spec;

        let mut ship = Ship::new(req.ttl, req.max_session_num);
        ships.create(&ship).await?;

        let container_spec = ContainerSpec {
            image: self.config.docker_image.clone(),
            network: self.config.docker_network.clone(),
            ttl: req.ttl,
            cpus: cpus.unwrap_or(self.config.default_ship_cpus),
            memory: memory.unwrap_or_else(|| self.config.default_ship_memory.clone()),
        };

        let provisioned = match self.driver.create(&ship.id, &container_spec).await {
            Ok(p) => p,
            Err(e) => {
                ships.delete(&ship.id).await?;
                return Err(e);
            }
        };

        ship.container_id = Some(provisioned.container_id.clone());
        ship.ip_address = Some(provisioned.ip_address.clone());
        ships.update(&ship).await?;

        if let Err(e) = self
            .readiness
            .wait_until_ready(
                &provisioned.ip_address,
                Duration::from_secs(self.config.ship_health_check_timeout),
                Duration::from_secs(self.config.ship_health_check_interval),
            )
            .await
        {
            let _ = self.driver.stop(&provisioned.container_id).await;
            ships.delete(&ship.id).await?;
            return Err(e);
        }

        info!(ship_id = %ship.id, "ship provisioned and ready");
        Ok(ship)
    }

    /// Extend a running Ship's TTL and rearm its expiry timer. A stopped
    /// Ship is terminal — extension of one is a not-found error, never a
    /// revival.
    pub async fn extend_ttl(&self, ship_id: &str, ttl: i64) -> Result<Ship> {
        let ships = ShipRepository::new(&self.db);
        let mut ship = ships
            .get(ship_id)
            .await?
            .filter(|s| s.is_running())
            .ok_or_else(|| BayError::NotFound(format!("ship {ship_id}")))?;

        ship.ttl = ttl;
        ships.update(&ship).await?;
        self.scheduler.schedule_ttl(ship_id.to_string(), ttl).await;

        Ok(ship)
    }

    /// Stop the container (best-effort) and delete the Ship row, cascading
    /// to its session bindings. Idempotent: deleting an already-gone Ship
    /// returns `false` rather than erroring.
    pub async fn delete_ship(&self, ship_id: &str) -> Result<bool> {
        let ships = ShipRepository::new(&self.db);
        let Some(ship) = ships.get(ship_id).await? else {
            return Ok(false);
        };

        if let Some(container_id) = ship.container_id.clone() {
            if let Err(e) = self.driver.stop(&container_id).await {
                warn!(ship_id, error = %e, "failed to stop container during delete");
            }
        }

        ships.delete(ship_id).await?;
        Ok(true)
    }

    /// Forward an exec request, gated on the Ship being running and the
    /// caller's session holding a binding to it. Guard failures are folded
    /// into `ExecResponse::failed` rather than raised, matching the
    /// Forwarder's "never leak transport errors" contract.
    pub async fn execute_operation(
        &self,
        ship_id: &str,
        session_id: &str,
        op_type: &str,
        payload: serde_json::Value,
    ) -> Result<ExecResponse> {
        let ships = ShipRepository::new(&self.db);
        let bindings = SessionShipRepository::new(&self.db);

        let Some(ship) = ships.get(ship_id).await? else {
            return Ok(ExecResponse::failed("Ship not found or not running"));
        };
        if !ship.is_running() {
            return Ok(ExecResponse::failed("Ship not found or not running"));
        }
        let Some(ip_address) = ship.ip_address.clone() else {
            return Ok(ExecResponse::failed("Ship IP address not available"));
        };
        if bindings.get(session_id, ship_id).await?.is_none() {
            return Ok(ExecResponse::failed(
                "Session does not have access to this ship",
            ));
        }

        bindings.update_activity(session_id, ship_id).await?;
        self.forwarder
            .forward_exec(&ip_address, session_id, op_type, payload)
            .await
    }

    /// Forward an upload, with the same affinity gate as
    /// [`Self::execute_operation`] plus a size check enforced once against
    /// the client's advertised `Content-Length` and once against the bytes
    /// actually read — either breach fails with `PayloadTooLarge`.
    pub async fn execute_upload(
        &self,
        ship_id: &str,
        session_id: &str,
        content_length_hint: Option<u64>,
        file_bytes: Vec<u8>,
        file_path: &str,
        filename: &str,
    ) -> Result<UploadResponse> {
        let max = self.config.max_upload_size as u64;
        if let Some(len) = content_length_hint {
            if len > max {
                return Err(BayError::PayloadTooLarge(format!(
                    "File size ({len} bytes) exceeds maximum allowed size ({max} bytes)"
                )));
            }
        }
        if file_bytes.len() as u64 > max {
            return Err(BayError::PayloadTooLarge(format!(
                "File size ({} bytes) exceeds maximum allowed size ({max} bytes)",
                file_bytes.len()
            )));
        }

        let ships = ShipRepository::new(&self.db);
        let bindings = SessionShipRepository::new(&self.db);

        let Some(ship) = ships.get(ship_id).await? else {
            return Ok(UploadResponse::failed(
                "upload failed",
                "Ship not found or not running",
            ));
        };
        if !ship.is_running() {
            return Ok(UploadResponse::failed(
                "upload failed",
                "Ship not found or not running",
            ));
        }
        let Some(ip_address) = ship.ip_address.clone() else {
            return Ok(UploadResponse::failed(
                "upload failed",
                "Ship IP address not available",
            ));
        };
        if bindings.get(session_id, ship_id).await?.is_none() {
            return Ok(UploadResponse::failed(
                "upload failed",
                "Session does not have access to this ship",
            ));
        }

        bindings.update_activity(session_id, ship_id).await?;
        self.forwarder
            .forward_upload(&ip_address, session_id, file_path, file_bytes, filename)
            .await
    }

    pub async fn get_ship(&self, ship_id: &str) -> Result<Option<Ship>> {
        ShipRepository::new(&self.db).get(ship_id).await
    }

    pub async fn get_logs(&self, ship_id: &str) -> Result<String> {
        let ships = ShipRepository::new(&self.db);
        let Some(ship) = ships.get(ship_id).await? else {
            return Ok(String::new());
        };
        let Some(container_id) = ship.container_id else {
            return Ok(String::new());
        };
        self.driver.logs(&container_id, None).await
    }
}
