use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use bay_types::BayError;

/// Wraps [`BayError`] so it can be returned directly from a handler and
/// translated to the wire status codes the original service used.
#[derive(Debug)]
pub struct ApiError(pub BayError);

impl From<BayError> for ApiError {
    fn from(err: BayError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BayError::Unauthorized => StatusCode::UNAUTHORIZED,
            BayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            BayError::NotFound(_) => StatusCode::NOT_FOUND,
            BayError::CapacityExceeded => StatusCode::REQUEST_TIMEOUT,
            BayError::CapacityTimeout => StatusCode::REQUEST_TIMEOUT,
            BayError::ProvisionError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BayError::ReadinessTimeout => StatusCode::INTERNAL_SERVER_ERROR,
            BayError::ForwardError(_) => StatusCode::BAD_GATEWAY,
            BayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            BayError::SchedulerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BayError::Config(_) | BayError::Store(_) | BayError::Io(_) | BayError::Json(_)
            | BayError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(ErrorBody {
                detail: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Translate an [`ExecResponse`]/[`UploadResponse`] failure string into the
/// status code the Ship worker's black-box error implies, matching the
/// substring heuristic the original upload route used.
pub fn status_for_error_message(message: &str) -> StatusCode {
    let lower = message.to_lowercase();
    if lower.contains("size") {
        StatusCode::PAYLOAD_TOO_LARGE
    } else if lower.contains("not found") {
        StatusCode::NOT_FOUND
    } else if lower.contains("access") {
        StatusCode::FORBIDDEN
    } else {
        StatusCode::BAD_REQUEST
    }
}
