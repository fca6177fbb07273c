use crate::synthesis::DEFAULT_LANG;
use serde::{Deserialize, Serialize};

pub mod handler;
pub mod middleware;
#[cfg(test)]
mod tests;
pub use handler::router;

fn default_lang() -> String {
    DEFAULT_LANG.to_string()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GenerateRequest {
    pub text: String,
    #[serde(default = "default_lang")]
    pub lang: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub file_id: String,
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfoResponse {
    pub success: bool,
    pub storage_url: String,
    pub audio_url: String,
    pub audio_bucket: String,
}

/// Error body of every failing route, request body rejections included.
#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}
