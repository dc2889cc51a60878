//! Shared fixtures for capture session integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use camera_capture::{CameraProvider, ImagePayload, SyntheticCamera};
use capture_session::{CaptureSession, PreviewRegistry, SessionConfig, SessionHandle};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use upload_client::{SubmissionMetadata, UploadError, UploadResult, Uploader};

pub fn metadata() -> SubmissionMetadata {
    SubmissionMetadata::new("1", "Aayush", "A7")
}

pub fn widget_result() -> UploadResult {
    let body = serde_json::json!({
        "inserted_id": "abc123",
        "data": { "products": { "Widget": { "quantity": "3", "price": "$9" } } }
    });
    UploadResult::from_slice(body.to_string().as_bytes()).unwrap()
}

pub fn config() -> SessionConfig {
    SessionConfig::with_default_resolution(32, 18)
}

pub async fn open_session(camera: &Arc<SyntheticCamera>) -> (CaptureSession, PreviewRegistry) {
    let previews = PreviewRegistry::new();
    let provider: Arc<dyn CameraProvider> = camera.clone();
    let session = CaptureSession::open(provider, previews.clone(), metadata(), config()).await;
    (session, previews)
}

pub async fn open_handle(camera: &Arc<SyntheticCamera>) -> (SessionHandle, PreviewRegistry) {
    let (session, previews) = open_session(camera).await;
    (SessionHandle::from_session(session), previews)
}

pub fn jpeg_file() -> ImagePayload {
    ImagePayload::from_file_bytes(Some("receipt.jpg".into()), "image/jpeg", vec![0xff, 0xd8, 0xff])
        .unwrap()
}

/// Answers uploads from a queue and counts calls
#[derive(Default)]
pub struct ScriptedUploader {
    calls: AtomicUsize,
    replies: Mutex<VecDeque<Result<UploadResult, UploadError>>>,
}

impl ScriptedUploader {
    pub fn new(replies: Vec<Result<UploadResult, UploadError>>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            replies: Mutex::new(replies.into()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Uploader for ScriptedUploader {
    async fn upload(
        &self,
        _payload: &ImagePayload,
        _metadata: &SubmissionMetadata,
    ) -> Result<UploadResult, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(UploadError::Network("no scripted reply".to_string())))
    }
}

/// Holds every upload until [`GatedUploader::open_gate`] is called
pub struct GatedUploader {
    calls: AtomicUsize,
    started: Notify,
    gate: Notify,
    reply: Result<UploadResult, UploadError>,
}

impl GatedUploader {
    pub fn new(reply: Result<UploadResult, UploadError>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            started: Notify::new(),
            gate: Notify::new(),
            reply,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wait until a request is in flight
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn open_gate(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl Uploader for GatedUploader {
    async fn upload(
        &self,
        _payload: &ImagePayload,
        _metadata: &SubmissionMetadata,
    ) -> Result<UploadResult, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.gate.notified().await;
        self.reply.clone()
    }
}
