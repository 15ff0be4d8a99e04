use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Running/stopped status of a Ship. `1` running, `0` stopped — matches the
/// integer encoding used by the persisted column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum ShipStatus {
    Stopped,
    Running,
}

impl From<ShipStatus> for i64 {
    fn from(status: ShipStatus) -> i64 {
        match status {
            ShipStatus::Stopped => 0,
            ShipStatus::Running => 1,
        }
    }
}

impl TryFrom<i64> for ShipStatus {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ShipStatus::Stopped),
            1 => Ok(ShipStatus::Running),
            other => Err(format!("invalid ship status: {other}")),
        }
    }
}

/// A provisioned sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ship {
    pub id: String,
    pub status: ShipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub container_id: Option<String>,
    pub ip_address: Option<String>,
    pub ttl: i64,
    pub max_session_num: i64,
    pub current_session_num: i64,
}

impl Ship {
    /// Construct a new, not-yet-provisioned Ship with a fresh id.
    pub fn new(ttl: i64, max_session_num: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            status: ShipStatus::Running,
            created_at: now,
            updated_at: now,
            container_id: None,
            ip_address: None,
            ttl,
            max_session_num,
            current_session_num: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == ShipStatus::Running
    }

    pub fn has_free_slot(&self) -> bool {
        self.is_running() && self.current_session_num < self.max_session_num
    }
}

/// Requested resource envelope for a new Ship's container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipSpec {
    pub cpus: Option<f64>,
    pub memory: Option<String>,
}

/// `POST /ship` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateShipRequest {
    pub ttl: i64,
    #[serde(default)]
    pub spec: Option<ShipSpec>,
    pub max_session_num: i64,
}

/// `POST /ship/{id}/extend-ttl` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtendTtlRequest {
    pub ttl: i64,
}

/// Wire representation of a Ship returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ShipResponse {
    pub id: String,
    pub status: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub container_id: Option<String>,
    pub ip_address: Option<String>,
    pub ttl: i64,
    pub max_session_num: i64,
    pub current_session_num: i64,
}

impl From<Ship> for ShipResponse {
    fn from(ship: Ship) -> Self {
        Self {
            id: ship.id,
            status: ship.status.into(),
            created_at: ship.created_at,
            updated_at: ship.updated_at,
            container_id: ship.container_id,
            ip_address: ship.ip_address,
            ttl: ship.ttl,
            max_session_num: ship.max_session_num,
            current_session_num: ship.current_session_num,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ship_starts_running_with_zero_sessions() {
        let ship = Ship::new(600, 2);
        assert!(ship.is_running());
        assert_eq!(ship.current_session_num, 0);
        assert!(ship.container_id.is_none());
        assert!(ship.has_free_slot());
    }

    #[test]
    fn stopped_ship_has_no_free_slot() {
        let mut ship = Ship::new(600, 2);
        ship.status = ShipStatus::Stopped;
        assert!(!ship.has_free_slot());
    }

    #[test]
    fn full_ship_has_no_free_slot() {
        let mut ship = Ship::new(600, 1);
        ship.current_session_num = 1;
        assert!(!ship.has_free_slot());
    }

    #[test]
    fn status_roundtrips_through_i64() {
        assert_eq!(i64::from(ShipStatus::Running), 1);
        assert_eq!(i64::from(ShipStatus::Stopped), 0);
        assert_eq!(ShipStatus::try_from(1).unwrap(), ShipStatus::Running);
        assert_eq!(ShipStatus::try_from(0).unwrap(), ShipStatus::Stopped);
        assert!(ShipStatus::try_from(2).is_err());
    }

    #[test]
    fn ship_response_preserves_fields() {
        let ship = Ship::new(120, 3);
        let id = ship.id.clone();
        let resp: ShipResponse = ship.into();
        assert_eq!(resp.id, id);
        assert_eq!(resp.status, 1);
        assert_eq!(resp.max_session_num, 3);
    }
}
