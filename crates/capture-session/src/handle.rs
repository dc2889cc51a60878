//! Shared session handle
//!
//! Hosts drive the session from UI callbacks while an upload is in flight, so
//! the session lives behind an async mutex. The lock is not held during the
//! request; `close` empties the slot and a late outcome finds nothing to update.

use camera_capture::{CameraProvider, ImagePayload};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::info;
use upload_client::{SubmissionMetadata, UploadError, UploadResult, Uploader};

use crate::preview::PreviewRegistry;
use crate::session::{CaptureSession, SessionEvent, UploadTicket};
use crate::view::ResultView;
use crate::{Mode, SessionConfig, SessionError};

/// Point-in-time copy of the session state for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub mode: Mode,
    pub last_error: Option<String>,
    pub has_camera: bool,
    pub preview_url: Option<String>,
    pub result: Option<ResultView>,
}

/// Cloneable handle to one capture session
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<Option<CaptureSession>>>,
}

impl SessionHandle {
    /// Open a session (see [`CaptureSession::open`])
    pub async fn open(
        camera: Arc<dyn CameraProvider>,
        previews: PreviewRegistry,
        metadata: SubmissionMetadata,
        config: SessionConfig,
    ) -> Self {
        Self::from_session(CaptureSession::open(camera, previews, metadata, config).await)
    }

    /// Share an already-open session
    pub fn from_session(session: CaptureSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(session))),
        }
    }

    /// Run `f` against the open session
    pub async fn with<R>(&self, f: impl FnOnce(&mut CaptureSession) -> R) -> Result<R, SessionError> {
        let mut slot = self.inner.lock().await;
        let session = slot.as_mut().ok_or(SessionError::Closed)?;
        Ok(f(session))
    }

    /// False once [`close`](Self::close) has run
    pub async fn is_open(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    /// Current mode, `None` once closed
    pub async fn mode(&self) -> Option<Mode> {
        self.inner.lock().await.as_ref().map(CaptureSession::mode)
    }

    /// Render-ready copy of the session state, `None` once closed
    pub async fn status(&self) -> Option<SessionStatus> {
        self.inner.lock().await.as_ref().map(|session| SessionStatus {
            mode: session.mode(),
            last_error: session.last_error().map(str::to_owned),
            has_camera: session.has_camera(),
            preview_url: session.preview_url().map(str::to_owned),
            result: session.result_view(),
        })
    }

    /// See [`CaptureSession::subscribe`]
    pub async fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<SessionEvent>, SessionError> {
        self.with(CaptureSession::subscribe).await
    }

    /// See [`CaptureSession::capture`]
    pub async fn capture(&self) -> Result<bool, SessionError> {
        self.with(CaptureSession::capture).await
    }

    /// See [`CaptureSession::pick_file`]
    pub async fn pick_file(&self, payload: ImagePayload) -> Result<bool, SessionError> {
        self.with(|session| session.pick_file(payload)).await
    }

    /// See [`CaptureSession::pick_file_path`]
    pub async fn pick_file_path(&self, path: impl Into<PathBuf>) -> Result<bool, SessionError> {
        let path = path.into();
        let mut slot = self.inner.lock().await;
        let session = slot.as_mut().ok_or(SessionError::Closed)?;
        Ok(session.pick_file_path(path).await)
    }

    /// See [`CaptureSession::retake`]
    pub async fn retake(&self) -> Result<bool, SessionError> {
        let mut slot = self.inner.lock().await;
        let session = slot.as_mut().ok_or(SessionError::Closed)?;
        Ok(session.retake().await)
    }

    /// See [`CaptureSession::upload_another`]
    pub async fn upload_another(&self) -> Result<bool, SessionError> {
        let mut slot = self.inner.lock().await;
        let session = slot.as_mut().ok_or(SessionError::Closed)?;
        Ok(session.upload_another().await)
    }

    /// Submit the held image.
    ///
    /// The request runs on its own task so it completes (and its outcome is
    /// applied or discarded) even if the caller stops waiting.
    pub async fn submit(&self, uploader: Arc<dyn Uploader>) -> Result<(), SessionError> {
        let ticket = self.with(CaptureSession::begin_submit).await??;

        let handle = self.clone();
        let task = tokio::spawn(async move {
            let outcome = uploader.upload(ticket.payload(), ticket.metadata()).await;
            handle.complete(ticket, outcome).await
        });

        task.await.map_err(|e| SessionError::Task(e.to_string()))?
    }

    /// Close the session. Returns `false` if it was already closed.
    pub async fn close(&self) -> bool {
        let session = self.inner.lock().await.take();
        match session {
            Some(session) => {
                session.close();
                true
            }
            None => false,
        }
    }

    async fn complete(
        &self,
        ticket: UploadTicket,
        outcome: Result<UploadResult, UploadError>,
    ) -> Result<(), SessionError> {
        let mut slot = self.inner.lock().await;
        match slot.as_mut() {
            Some(session) => session.complete_submit(ticket, outcome),
            None => {
                info!(
                    "Upload attempt {} finished after close; outcome discarded",
                    ticket.attempt()
                );
                Err(SessionError::Closed)
            }
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle").finish_non_exhaustive()
    }
}
