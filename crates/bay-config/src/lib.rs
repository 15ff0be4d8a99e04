pub mod config;

pub use config::{BehaviorAfterMax, Config};
