//! One scan from the command line

use anyhow::{bail, Context, Result};
use camera_capture::{CameraProvider, SyntheticCamera};
use capture_session::{PreviewRegistry, SessionHandle, SessionStatus};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use upload_client::{UploadClient, Uploader};

use crate::ScannerConfig;

/// Camera backend for the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CameraChoice {
    /// Generated test pattern
    #[default]
    Synthetic,
    /// No camera; only file input works
    None,
}

impl CameraChoice {
    /// Provider backing this choice
    pub fn provider(self) -> Arc<dyn CameraProvider> {
        match self {
            CameraChoice::Synthetic => Arc::new(SyntheticCamera::default()),
            CameraChoice::None => Arc::new(SyntheticCamera::absent()),
        }
    }
}

/// What one `scan` invocation does
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Use this image instead of capturing a still
    pub file: Option<PathBuf>,
    pub camera: CameraChoice,
    /// Send the image to the processing service
    pub submit: bool,
}

/// Open a session, capture or pick an image, optionally submit it, and
/// return the final state.
///
/// A failed upload is reported through the returned status, not as an error.
pub async fn run_scan(config: &ScannerConfig, options: &ScanOptions) -> Result<SessionStatus> {
    let handle = SessionHandle::open(
        options.camera.provider(),
        PreviewRegistry::new(),
        config.metadata(),
        config.session_config(),
    )
    .await;

    let status = scan(&handle, config, options).await;
    handle.close().await;
    status
}

async fn scan(
    handle: &SessionHandle,
    config: &ScannerConfig,
    options: &ScanOptions,
) -> Result<SessionStatus> {
    let picked = match &options.file {
        Some(path) => handle.pick_file_path(path.clone()).await?,
        None => handle.capture().await?,
    };
    if !picked {
        let reason = handle
            .status()
            .await
            .and_then(|status| status.last_error)
            .unwrap_or_else(|| "no image available".to_string());
        bail!("Nothing to submit: {reason}");
    }

    if options.submit {
        let uploader: Arc<dyn Uploader> = Arc::new(UploadClient::new(config.upload_config())?);
        match handle.submit(uploader).await {
            Ok(()) => info!("Scan processed"),
            Err(e) => warn!("Scan not processed: {}", e),
        }
    }

    handle.status().await.context("session closed during scan")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use capture_session::Mode;

    async fn processing_service(status: StatusCode, body: serde_json::Value) -> ScannerConfig {
        let app = Router::new().route(
            "/process-image",
            post(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        ScannerConfig {
            base_url: format!("http://{addr}"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_capture_without_submit_stays_in_preview() {
        let config = ScannerConfig::default();
        let status = run_scan(&config, &ScanOptions::default()).await.unwrap();

        assert_eq!(status.mode, Mode::Preview);
        assert!(status.preview_url.is_some());
        assert!(status.result.is_none());
    }

    #[tokio::test]
    async fn test_no_camera_and_no_file_fails() {
        let options = ScanOptions {
            camera: CameraChoice::None,
            ..Default::default()
        };
        let err = run_scan(&ScannerConfig::default(), &options).await.unwrap_err();
        assert!(err.to_string().contains("gallery"));
    }

    #[tokio::test]
    async fn test_file_submit_succeeds() {
        let config = processing_service(
            StatusCode::OK,
            serde_json::json!({
                "inserted_id": "abc123",
                "data": { "products": { "Widget": { "quantity": "3" } } }
            }),
        )
        .await;

        let dir = std::env::temp_dir().join(format!("scan-test-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("receipt.png");
        tokio::fs::write(&path, b"png bytes").await.unwrap();

        let options = ScanOptions {
            file: Some(path),
            camera: CameraChoice::None,
            submit: true,
        };
        let status = run_scan(&config, &options).await.unwrap();

        assert_eq!(status.mode, Mode::Succeeded);
        let view = status.result.unwrap();
        assert_eq!(view.document_id, "abc123");
        assert_eq!(view.product_count, 1);
    }

    #[tokio::test]
    async fn test_rejected_submit_is_reported_in_status() {
        let config = processing_service(
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({ "detail": "OCR backend offline" }),
        )
        .await;
        let options = ScanOptions {
            submit: true,
            ..Default::default()
        };
        let status = run_scan(&config, &options).await.unwrap();

        assert_eq!(status.mode, Mode::Preview);
        assert_eq!(status.last_error.as_deref(), Some("OCR backend offline"));
    }
}
