use serde::Serialize;

/// `GET /` and `GET /health` response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// `GET /ship/logs/{id}` response.
#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}
