//! Upload Client
//!
//! Submits a captured document image to the processing service:
//! - Multipart request (`file` + submission metadata text parts)
//! - Success/error classification of the response
//! - Parsed product listing for the result view
//!
//! Exactly one request is issued per call. There is no retry policy.

mod client;
mod response;

pub use client::{UploadClient, MISSING_IMAGE};
pub use response::{ExtractedData, ProductDetails, UploadResult};

use async_trait::async_trait;
use camera_capture::ImagePayload;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Route of the processing endpoint, relative to the base URL
pub const PROCESS_IMAGE_ROUTE: &str = "process-image";

/// File name used for payloads that did not come from a named file
pub const DEFAULT_FILE_NAME: &str = "scan.png";

/// Message used when the server rejects an upload without saying why
pub const GENERIC_FAILURE: &str = "Upload failed";

/// Upload error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Upload rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl UploadError {
    /// Message shown to the user in the session error slot
    pub fn user_message(&self) -> String {
        match self {
            UploadError::Validation(message) => message.clone(),
            UploadError::Rejected { message, .. } => message.clone(),
            UploadError::MalformedResponse(_) => {
                format!("{GENERIC_FAILURE}: the server returned an unreadable response.")
            }
            UploadError::Network(_) => {
                "Network error: could not reach the processing service.".to_string()
            }
            UploadError::Config(reason) => format!("Upload is not configured correctly: {reason}"),
        }
    }
}

/// Identity and location attached to every upload.
///
/// Supplied by the caller (authentication context); the user cannot edit it
/// during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionMetadata {
    pub user_id: String,
    pub user_name: String,
    pub pick_up_location: String,
}

impl SubmissionMetadata {
    pub fn new(
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        pick_up_location: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            pick_up_location: pick_up_location.into(),
        }
    }
}

/// Upload client configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Processing service base URL (e.g. `https://scanner.example.com`)
    pub base_url: String,
    /// Whole-request timeout; OCR and extraction can take a while
    pub timeout: Duration,
    /// User-Agent header
    pub user_agent: String,
    /// File name for payloads without one
    pub fallback_file_name: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: Duration::from_secs(60),
            user_agent: format!("receipt-scanner/{}", env!("CARGO_PKG_VERSION")),
            fallback_file_name: DEFAULT_FILE_NAME.to_string(),
        }
    }
}

impl UploadConfig {
    /// Config for `base_url` with default timeout
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Full endpoint URL: `{base_url}/process-image`
    pub fn endpoint(&self) -> Result<reqwest::Url, UploadError> {
        let base = format!("{}/", self.base_url.trim().trim_end_matches('/'));
        let url = reqwest::Url::parse(&base)
            .map_err(|e| UploadError::Config(format!("invalid base url {base:?}: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(UploadError::Config(format!(
                "unsupported scheme {:?}",
                url.scheme()
            )));
        }

        url.join(PROCESS_IMAGE_ROUTE)
            .map_err(|e| UploadError::Config(e.to_string()))
    }
}

/// Anything that can submit a payload and classify the outcome.
///
/// [`UploadClient`] is the network implementation; the session only depends on
/// this trait.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(
        &self,
        payload: &ImagePayload,
        metadata: &SubmissionMetadata,
    ) -> Result<UploadResult, UploadError>;
}
