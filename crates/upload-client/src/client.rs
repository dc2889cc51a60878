//! HTTP implementation of [`Uploader`]

use async_trait::async_trait;
use camera_capture::ImagePayload;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use tracing::{debug, error, info, warn};

use crate::response::rejection_message;
use crate::{SubmissionMetadata, UploadConfig, UploadError, UploadResult, Uploader};

/// Message for a submit without an image
pub const MISSING_IMAGE: &str = "Please capture or select an image first.";

/// Submits payloads to `POST {base_url}/process-image`
#[derive(Debug, Clone)]
pub struct UploadClient {
    config: UploadConfig,
    endpoint: reqwest::Url,
    http: reqwest::Client,
}

impl UploadClient {
    /// Create a client; fails only on an unusable configuration
    pub fn new(config: UploadConfig) -> Result<Self, UploadError> {
        let endpoint = config.endpoint()?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| UploadError::Config(e.to_string()))?;

        info!("Upload client ready: {}", endpoint);
        Ok(Self {
            config,
            endpoint,
            http,
        })
    }

    /// Resolved endpoint URL
    pub fn endpoint(&self) -> &reqwest::Url {
        &self.endpoint
    }

    /// Submit one payload and classify the response
    pub async fn process_image(
        &self,
        payload: &ImagePayload,
        metadata: &SubmissionMetadata,
    ) -> Result<UploadResult, UploadError> {
        if payload.is_empty() {
            return Err(UploadError::Validation(MISSING_IMAGE.to_string()));
        }

        let form = self.build_form(payload, metadata)?;
        debug!(
            "POST {} ({} bytes, {})",
            self.endpoint,
            payload.len(),
            payload.media_type()
        );

        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!("Upload transport failure: {}", e);
                UploadError::Network(e.to_string())
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            error!("Upload response body lost: {}", e);
            UploadError::Network(e.to_string())
        })?;

        if !status.is_success() {
            let message = rejection_message(&body);
            warn!("Upload rejected with {}: {}", status, message);
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let result = UploadResult::from_slice(&body).inspect_err(|e| {
            warn!("Upload succeeded with {} but body is unusable: {}", status, e);
        })?;

        info!(
            "Upload processed: record {} with {} product(s)",
            result.inserted_id.as_deref().unwrap_or("<none>"),
            result.product_count()
        );
        Ok(result)
    }

    fn build_form(
        &self,
        payload: &ImagePayload,
        metadata: &SubmissionMetadata,
    ) -> Result<Form, UploadError> {
        let file_name = payload
            .file_name()
            .unwrap_or(self.config.fallback_file_name.as_str())
            .to_string();

        // Body over the payload's shared buffer; the image is not copied
        let body = Body::from(Bytes::from_owner(payload.shared_bytes()));
        let file = Part::stream_with_length(body, payload.len() as u64)
            .file_name(file_name)
            .mime_str(payload.media_type())
            .map_err(|e| UploadError::Validation(format!("invalid media type: {e}")))?;

        Ok(Form::new()
            .part("file", file)
            .text("user_id", metadata.user_id.clone())
            .text("user_name", metadata.user_name.clone())
            .text("pick_up_location", metadata.pick_up_location.clone()))
    }
}

#[async_trait]
impl Uploader for UploadClient {
    async fn upload(
        &self,
        payload: &ImagePayload,
        metadata: &SubmissionMetadata,
    ) -> Result<UploadResult, UploadError> {
        self.process_image(payload, metadata).await
    }
}
