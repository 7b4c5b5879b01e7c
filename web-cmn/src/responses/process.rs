use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Completed,
    Failed,
}

/// Body of a successful `POST /api/process`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessResponse {
    pub status: ProcessStatus,
    /// URL path of the density image, e.g. `/static/<job id>.png`.
    pub result: String,
}

impl ProcessResponse {
    pub fn completed(result: impl Into<String>) -> Self {
        Self {
            status: ProcessStatus::Completed,
            result: result.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub status: ProcessStatus,
    pub kind: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn failed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: ProcessStatus::Failed,
            kind: kind.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
}
