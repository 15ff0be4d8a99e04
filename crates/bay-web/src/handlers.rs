use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::warn;

use bay_types::{CreateShipRequest, ExtendTtlRequest, ShipResponse};

use crate::error::{status_for_error_message, ApiError};
use crate::state::AppState;
use crate::types::{ErrorDetail, HealthResponse, LogsResponse};

const SESSION_ID_HEADER: &str = "x-session-id";
const FILE_PATH_HEADER: &str = "x-file-path";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, Response> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorDetail {
                    detail: format!("{name} header is required"),
                }),
            )
                .into_response()
        })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Bay service is running",
    })
}

pub async fn root() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Welcome to Bay API",
    })
}

pub async fn create_ship(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateShipRequest>,
) -> Result<Response, Response> {
    let session_id = header_str(&headers, SESSION_ID_HEADER)?;

    let ship = state
        .allocator
        .get_or_create_ship(session_id, request)
        .await
        .map_err(|e| ApiError::from(e).into_response())?;

    Ok((StatusCode::CREATED, Json(ShipResponse::from(ship))).into_response())
}

pub async fn get_ship(
    State(state): State<Arc<AppState>>,
    Path(ship_id): Path<String>,
) -> Result<Json<ShipResponse>, Response> {
    let ship = state
        .allocator
        .get_ship(&ship_id)
        .await
        .map_err(|e| ApiError::from(e).into_response())?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorDetail {
                    detail: "Ship not found".to_string(),
                }),
            )
                .into_response()
        })?;

    Ok(Json(ShipResponse::from(ship)))
}

pub async fn delete_ship(
    State(state): State<Arc<AppState>>,
    Path(ship_id): Path<String>,
) -> Result<StatusCode, Response> {
    let deleted = state
        .allocator
        .delete_ship(&ship_id)
        .await
        .map_err(|e| ApiError::from(e).into_response())?;

    if !deleted {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorDetail {
                detail: "Ship not found".to_string(),
            }),
        )
            .into_response());
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn extend_ttl(
    State(state): State<Arc<AppState>>,
    Path(ship_id): Path<String>,
    Json(request): Json<ExtendTtlRequest>,
) -> Result<Json<ShipResponse>, Response> {
    let ship = state
        .allocator
        .extend_ttl(&ship_id, request.ttl)
        .await
        .map_err(|e| match e {
            bay_types::BayError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                Json(ErrorDetail {
                    detail: "Ship not found".to_string(),
                }),
            )
                .into_response(),
            other => ApiError::from(other).into_response(),
        })?;

    Ok(Json(ShipResponse::from(ship)))
}

pub async fn get_logs(
    State(state): State<Arc<AppState>>,
    Path(ship_id): Path<String>,
) -> Result<Json<LogsResponse>, Response> {
    let logs = state
        .allocator
        .get_logs(&ship_id)
        .await
        .map_err(|e| ApiError::from(e).into_response())?;

    Ok(Json(LogsResponse { logs }))
}

pub async fn execute_operation(
    State(state): State<Arc<AppState>>,
    Path(ship_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<bay_types::ExecRequest>,
) -> Result<Response, Response> {
    let session_id = header_str(&headers, SESSION_ID_HEADER)?;

    let response = state
        .allocator
        .execute_operation(
            &ship_id,
            session_id,
            &request.op_type,
            request.payload.unwrap_or(serde_json::Value::Null),
        )
        .await
        .map_err(|e| ApiError::from(e).into_response())?;

    if !response.success {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorDetail {
                detail: response.error.unwrap_or_else(|| "Unknown error".to_string()),
            }),
        )
            .into_response());
    }

    Ok(Json(response).into_response())
}

pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    Path(ship_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, Response> {
    let session_id = header_str(&headers, SESSION_ID_HEADER)?.to_string();
    let file_path = header_str(&headers, FILE_PATH_HEADER)?.to_string();

    let content_length = headers
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let mut filename = "upload.bin".to_string();
    let mut bytes: Vec<u8> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorDetail {
                detail: format!("invalid multipart body: {e}"),
            }),
        )
            .into_response()
    })? {
        if field.name() == Some("file") {
            if let Some(name) = field.file_name() {
                filename = name.to_string();
            }
            bytes = field
                .bytes()
                .await
                .map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(ErrorDetail {
                            detail: format!("failed to read upload body: {e}"),
                        }),
                    )
                        .into_response()
                })?
                .to_vec();
        }
    }

    let response = state
        .allocator
        .execute_upload(&ship_id, &session_id, content_length, bytes, &file_path, &filename)
        .await
        .map_err(|e| match e {
            bay_types::BayError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(ErrorDetail { detail: msg }),
            )
                .into_response(),
            other => {
                warn!(ship_id, error = %other, "upload forwarding failed");
                ApiError::from(other).into_response()
            }
        })?;

    if !response.success {
        let message = response.error.clone().unwrap_or_else(|| "Unknown error".to_string());
        return Err((
            status_for_error_message(&message),
            Json(ErrorDetail { detail: message }),
        )
            .into_response());
    }

    Ok(Json(response).into_response())
}
