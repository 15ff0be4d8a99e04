//! HTTP API surface for the Bay control plane: an axum [`Router`] wired
//! against an [`bay_core::Allocator`].

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod error;
pub mod handlers;
pub mod state;
pub mod types;

pub use state::AppState;

/// Build the full router: unauthenticated `/` and `/health`, everything
/// else behind the bearer-token gate.
pub fn router(state: AppState) -> Router {
    let state = Arc::new(state);

    let ship_routes = Router::new()
        .route("/ship", post(handlers::create_ship))
        .route(
            "/ship/{ship_id}",
            get(handlers::get_ship).delete(handlers::delete_ship),
        )
        .route("/ship/{ship_id}/exec", post(handlers::execute_operation))
        .route("/ship/{ship_id}/upload", post(handlers::upload_file))
        .route("/ship/{ship_id}/extend-ttl", post(handlers::extend_ttl))
        .route("/ship/logs/{ship_id}", get(handlers::get_logs))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer_token,
        ));

    // Permissive by default, matching the original service's CORSMiddleware.
    // `allow_credentials` is deliberately left off: tower_http rejects pairing
    // it with a wildcard origin, and the original's `allow_origins=["*"]`
    // plus `allow_credentials=True` combination never carries (no browser
    // honors it) so wildcard-without-credentials is the one that actually
    // does anything.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .merge(ship_routes)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}
