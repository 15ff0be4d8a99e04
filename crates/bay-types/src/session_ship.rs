use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A binding asserting that `session_id` is authorized to use `ship_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionShip {
    pub id: String,
    pub session_id: String,
    pub ship_id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl SessionShip {
    pub fn new(session_id: impl Into<String>, ship_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            ship_id: ship_id.into(),
            created_at: now,
            last_activity: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_binding_sets_created_and_activity_equal() {
        let b = SessionShip::new("session-a", "ship-1");
        assert_eq!(b.session_id, "session-a");
        assert_eq!(b.ship_id, "ship-1");
        assert_eq!(b.created_at, b.last_activity);
    }
}
