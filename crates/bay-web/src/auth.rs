use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use crate::state::AppState;

/// Bearer-token gate applied to every route except `/` and `/health`.
/// Missing header is a 403 (no credentials presented at all); a present but
/// wrong token is a 401 — matching the original service's
/// `HTTPBearer`/`verify_token` split.
pub async fn require_bearer_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::FORBIDDEN)?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::FORBIDDEN)?;

    if token != state.config.access_token {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
