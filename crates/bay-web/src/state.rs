use std::sync::Arc;

use bay_config::Config;
use bay_core::Allocator;

/// Shared handle every request sees. Cloned per-request (it's just two
/// `Arc`s), not rebuilt.
#[derive(Clone)]
pub struct AppState {
    pub allocator: Arc<Allocator>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(allocator: Arc<Allocator>, config: Arc<Config>) -> Self {
        Self { allocator, config }
    }
}
