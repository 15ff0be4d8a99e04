use serde::{Deserialize, Serialize};

/// `POST /ship/{id}/exec` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecRequest {
    #[serde(rename = "type")]
    pub op_type: String,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

/// Response from forwarding an operation to a Ship worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Response from forwarding a file upload to a Ship worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResponse {
    pub fn ok(file_path: impl Into<String>, size: u64) -> Self {
        Self {
            success: true,
            message: "upload accepted".to_string(),
            file_path: Some(file_path.into()),
            size: Some(size),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            file_path: None,
            size: None,
            error: Some(error.into()),
        }
    }
}
