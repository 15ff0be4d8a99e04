pub mod connection;
pub mod session_ships;
pub mod ships;

pub use connection::Database;
pub use session_ships::SessionShipRepository;
pub use ships::ShipRepository;
