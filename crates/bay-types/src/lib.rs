pub mod error;
pub mod exec;
pub mod session_ship;
pub mod ship;

pub use error::{BayError, Result};
pub use exec::{ExecRequest, ExecResponse, UploadResponse};
pub use session_ship::SessionShip;
pub use ship::{CreateShipRequest, ExtendTtlRequest, Ship, ShipResponse, ShipSpec, ShipStatus};
