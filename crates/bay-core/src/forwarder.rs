use std::time::Duration;

use tracing::warn;

use bay_types::{BayError, ExecResponse, Result, UploadResponse};

const SESSION_ID_HEADER: &str = "X-SESSION-ID";
const FORWARD_TIMEOUT_SECS: u64 = 30;

/// Forwards exec/upload requests from the control plane to a Ship worker
/// over its HTTP API. Readiness polling lives in [`crate::ReadinessProbe`].
pub struct Forwarder {
    client: reqwest::Client,
}

impl Forwarder {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| BayError::ForwardError(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }

    /// `POST http://{ip}:8123/{op_type}` with the session id attached so the
    /// Ship can scope its filesystem/session state. `op_type` becomes the
    /// path, matching the Ship worker's per-operation route convention.
    pub async fn forward_exec(
        &self,
        ip_address: &str,
        session_id: &str,
        op_type: &str,
        body: serde_json::Value,
    ) -> Result<ExecResponse> {
        let url = format!("http://{ip_address}:8123/{op_type}");

        let result = self
            .client
            .post(&url)
            .header(SESSION_ID_HEADER, session_id)
            .json(&body)
            .timeout(Duration::from_secs(FORWARD_TIMEOUT_SECS))
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => resp
                .json::<ExecResponse>()
                .await
                .map_err(|e| BayError::ForwardError(format!("invalid ship response: {e}"))),
            Ok(resp) => {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                Ok(ExecResponse::failed(format!(
                    "ship returned {status}: {text}"
                )))
            }
            Err(e) if e.is_timeout() => {
                warn!(ip_address, "forward timed out");
                Ok(ExecResponse::failed("ship request timed out"))
            }
            Err(e) => {
                warn!(ip_address, error = %e, "forward connection error");
                Ok(ExecResponse::failed(format!("connection error: {e}")))
            }
        }
    }

    /// `POST http://{ip}:8123/upload` with a raw multipart body already
    /// assembled by the caller. The `file_path` field tells the Ship worker
    /// where under its workspace to write the bytes.
    pub async fn forward_upload(
        &self,
        ip_address: &str,
        session_id: &str,
        file_path: &str,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<UploadResponse> {
        let url = format!("http://{ip_address}:8123/upload");

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .text("file_path", file_path.to_string())
            .part("file", part);

        let result = self
            .client
            .post(&url)
            .header(SESSION_ID_HEADER, session_id)
            .multipart(form)
            .timeout(Duration::from_secs(FORWARD_TIMEOUT_SECS))
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => resp
                .json::<UploadResponse>()
                .await
                .map_err(|e| BayError::ForwardError(format!("invalid ship response: {e}"))),
            Ok(resp) => {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                Ok(UploadResponse::failed(
                    "upload failed",
                    format!("ship returned {status}: {text}"),
                ))
            }
            Err(e) if e.is_timeout() => {
                Ok(UploadResponse::failed("upload failed", "ship request timed out"))
            }
            Err(e) => Ok(UploadResponse::failed(
                "upload failed",
                format!("connection error: {e}"),
            )),
        }
    }
}
