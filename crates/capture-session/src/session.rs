//! Capture session state machine

use camera_capture::{CameraProvider, ImagePayload, StreamGuard};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use upload_client::{SubmissionMetadata, UploadError, UploadResult, Uploader, MISSING_IMAGE};
use uuid::Uuid;

use crate::preview::{PreviewHandle, PreviewRegistry};
use crate::view::ResultView;
use crate::{Mode, SessionConfig, SessionError};

/// Error slot text after an upload was abandoned without an outcome
pub const UPLOAD_CANCELLED: &str = "Upload cancelled. You can try again.";

/// Notifications for the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// An upload succeeded
    Processed(UploadResult),
    /// The session was torn down
    Closed { session_id: Uuid },
}

/// Snapshot of an accepted submit: what to send and which attempt it belongs to
#[derive(Debug, Clone)]
pub struct UploadTicket {
    session_id: Uuid,
    attempt: u64,
    payload: ImagePayload,
    metadata: SubmissionMetadata,
}

impl UploadTicket {
    /// Image to send, shared with the session's copy
    pub fn payload(&self) -> &ImagePayload {
        &self.payload
    }

    /// Submitter identity to send with the image
    pub fn metadata(&self) -> &SubmissionMetadata {
        &self.metadata
    }

    /// Attempt number this ticket belongs to (starts at 1)
    pub fn attempt(&self) -> u64 {
        self.attempt
    }
}

/// One scan attempt.
///
/// Owns at most one camera stream and at most one preview handle. Both are
/// released when the session is closed or dropped, whatever its mode.
pub struct CaptureSession {
    id: Uuid,
    config: SessionConfig,
    camera: Arc<dyn CameraProvider>,
    previews: PreviewRegistry,
    metadata: SubmissionMetadata,

    mode: Mode,
    stream: Option<StreamGuard>,
    payload: Option<ImagePayload>,
    preview: Option<PreviewHandle>,
    result: Option<UploadResult>,
    last_error: Option<String>,

    /// Number of submits accepted so far; identifies the in-flight attempt
    attempt: u64,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl CaptureSession {
    /// Open the capture surface and try to start the camera.
    ///
    /// A denied or missing camera does not fail the open: the session stays in
    /// `Acquiring` with the error slot set, and file picking still works.
    pub async fn open(
        camera: Arc<dyn CameraProvider>,
        previews: PreviewRegistry,
        metadata: SubmissionMetadata,
        config: SessionConfig,
    ) -> Self {
        let mut session = Self {
            id: Uuid::new_v4(),
            config,
            camera,
            previews,
            metadata,
            mode: Mode::Acquiring,
            stream: None,
            payload: None,
            preview: None,
            result: None,
            last_error: None,
            attempt: 0,
            events: None,
        };
        info!("Capture session {} opened", session.id);

        session.start_camera().await;
        session
    }

    /// Receive [`SessionEvent`]s. Replaces any earlier subscriber.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    /// Snapshot the live frame into a PNG still and move to `Preview`.
    ///
    /// Returns `false` (and stays `Live`) when there is no live stream or no
    /// decodable frame.
    pub fn capture(&mut self) -> bool {
        if !self.mode.can_capture() {
            debug!("Capture ignored while {}", self.mode);
            return false;
        }
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };

        let (width, height) = stream
            .dimensions()
            .filter(|&(width, height)| width > 0 && height > 0)
            .unwrap_or(self.config.default_resolution);
        let Some(frame) = stream.snapshot() else {
            debug!("Capture ignored: no decodable frame");
            return false;
        };

        let payload = match ImagePayload::from_frame(&frame, width, height) {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!("Capture ignored: frame could not be rendered");
                return false;
            }
            Err(e) => {
                warn!("Capture ignored: {}", e);
                return false;
            }
        };

        self.release_camera();
        self.last_error = None;
        self.set_payload(payload);
        self.mode = Mode::Preview;
        info!("Captured {}x{} still", width, height);

        self.check_invariants();
        true
    }

    /// Use a picked gallery file instead of the camera
    pub fn pick_file(&mut self, payload: ImagePayload) -> bool {
        if !self.mode.can_pick_file() {
            debug!("File pick ignored while {}", self.mode);
            return false;
        }

        self.release_camera();
        self.last_error = None;
        info!(
            "Picked file {} ({}, {} bytes)",
            payload.file_name().unwrap_or("<unnamed>"),
            payload.media_type(),
            payload.len()
        );
        self.set_payload(payload);
        self.mode = Mode::Preview;

        self.check_invariants();
        true
    }

    /// Pick raw file bytes; non-image media types are reported in the error
    /// slot and leave the session unchanged
    pub fn pick_file_bytes(
        &mut self,
        file_name: Option<String>,
        media_type: &str,
        bytes: Vec<u8>,
    ) -> bool {
        if !self.mode.can_pick_file() {
            debug!("File pick ignored while {}", self.mode);
            return false;
        }
        match ImagePayload::from_file_bytes(file_name, media_type, bytes) {
            Ok(payload) => self.pick_file(payload),
            Err(e) => {
                warn!("File pick rejected: {}", e);
                self.last_error = Some(e.user_message());
                false
            }
        }
    }

    /// Pick a file from disk
    pub async fn pick_file_path(&mut self, path: impl AsRef<Path>) -> bool {
        if !self.mode.can_pick_file() {
            debug!("File pick ignored while {}", self.mode);
            return false;
        }
        match ImagePayload::from_file(path).await {
            Ok(payload) => self.pick_file(payload),
            Err(e) => {
                warn!("File pick failed: {}", e);
                self.last_error = Some(e.user_message());
                false
            }
        }
    }

    /// Drop the still and any result, then reopen the camera
    pub async fn retake(&mut self) -> bool {
        if !self.mode.can_retake() {
            debug!("Retake ignored while {}", self.mode);
            return false;
        }

        self.clear_payload();
        self.result = None;
        self.last_error = None;
        info!("Retake from {}", self.mode);

        self.start_camera().await;
        true
    }

    /// Start over after a successful upload
    pub async fn upload_another(&mut self) -> bool {
        if self.mode != Mode::Succeeded {
            debug!("Upload another ignored while {}", self.mode);
            return false;
        }
        self.retake().await
    }

    /// Accept a submit and move to `Uploading`.
    ///
    /// Fails with [`SessionError::Busy`] while an upload is in flight and with
    /// a validation error (no network call) when there is no image to send.
    pub fn begin_submit(&mut self) -> Result<UploadTicket, SessionError> {
        match self.mode {
            Mode::Uploading => {
                debug!("Submit ignored: attempt {} in flight", self.attempt);
                return Err(SessionError::Busy);
            }
            Mode::Succeeded => {
                return Err(SessionError::InvalidTransition {
                    action: "submit",
                    mode: self.mode,
                });
            }
            _ => {}
        }

        let payload = match &self.payload {
            Some(payload) if self.mode.can_submit() && !payload.is_empty() => payload.clone(),
            _ => {
                let err = UploadError::Validation(MISSING_IMAGE.to_string());
                warn!("Submit rejected: {}", err);
                self.last_error = Some(err.user_message());
                return Err(err.into());
            }
        };

        self.attempt += 1;
        self.last_error = None;
        self.mode = Mode::Uploading;
        info!("Upload attempt {} started ({} bytes)", self.attempt, payload.len());

        self.check_invariants();
        Ok(UploadTicket {
            session_id: self.id,
            attempt: self.attempt,
            payload,
            metadata: self.metadata.clone(),
        })
    }

    /// Apply the outcome of the attempt described by `ticket`.
    ///
    /// Outcomes for an attempt that is no longer in flight are discarded with
    /// [`SessionError::StaleResult`] and change nothing.
    pub fn complete_submit(
        &mut self,
        ticket: UploadTicket,
        outcome: Result<UploadResult, UploadError>,
    ) -> Result<(), SessionError> {
        if ticket.session_id != self.id
            || ticket.attempt != self.attempt
            || self.mode != Mode::Uploading
        {
            warn!(
                "Discarding outcome of attempt {} (session {} is {})",
                ticket.attempt, self.id, self.mode
            );
            return Err(SessionError::StaleResult);
        }

        let applied = match outcome {
            Ok(result) => {
                info!(
                    "Upload attempt {} succeeded: {} product(s)",
                    ticket.attempt,
                    result.product_count()
                );
                self.emit(SessionEvent::Processed(result.clone()));
                self.result = Some(result);
                self.last_error = None;
                self.mode = Mode::Succeeded;
                Ok(())
            }
            Err(e) => {
                warn!("Upload attempt {} failed: {}", ticket.attempt, e);
                self.last_error = Some(e.user_message());
                self.mode = Mode::Preview;
                Err(e.into())
            }
        };

        self.check_invariants();
        applied
    }

    /// Give up on the attempt described by `ticket` without an outcome.
    ///
    /// The session returns to `Preview` with the image kept and
    /// [`UPLOAD_CANCELLED`] in the error slot, so the user can retry or retake.
    pub fn cancel_submit(&mut self, ticket: UploadTicket) -> Result<(), SessionError> {
        if ticket.session_id != self.id {
            return Err(SessionError::StaleResult);
        }
        if self.abandon_attempt(ticket.attempt) {
            Ok(())
        } else {
            Err(SessionError::StaleResult)
        }
    }

    /// Submit the held image with `uploader` (one request, no retry).
    ///
    /// This borrows the session for the whole request. If the returned future
    /// is dropped before the upload finishes, the attempt is cancelled as by
    /// [`cancel_submit`](Self::cancel_submit). Hosts that need to close the
    /// session while a request is in flight use
    /// [`SessionHandle`](crate::SessionHandle).
    pub async fn submit(&mut self, uploader: &dyn Uploader) -> Result<(), SessionError> {
        let ticket = self.begin_submit()?;
        let attempt = AttemptGuard {
            session: Some(self),
            attempt: ticket.attempt,
        };
        let outcome = uploader.upload(&ticket.payload, &ticket.metadata).await;
        attempt.complete(ticket, outcome)
    }

    /// Tear the session down. Releases the camera and revokes the preview.
    pub fn close(self) {
        drop(self);
    }

    /// Session identifier used in logs and [`SessionEvent::Closed`]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// User-facing message from the last failed action, if any
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Held image; present exactly in `Preview`, `Uploading` and `Succeeded`
    pub fn payload(&self) -> Option<&ImagePayload> {
        self.payload.as_ref()
    }

    /// Preview reference for the renderer
    pub fn preview_url(&self) -> Option<&str> {
        self.preview.as_ref().map(PreviewHandle::url)
    }

    /// Parsed response of the successful upload
    pub fn result(&self) -> Option<&UploadResult> {
        self.result.as_ref()
    }

    /// Identity attached to every upload from this session
    pub fn metadata(&self) -> &SubmissionMetadata {
        &self.metadata
    }

    /// True while a camera stream is held
    pub fn has_camera(&self) -> bool {
        self.stream.is_some()
    }

    /// True in the no-camera state: acquisition failed and only the file-pick
    /// fallback is available
    pub fn camera_unavailable(&self) -> bool {
        self.mode == Mode::Acquiring && self.stream.is_none() && self.last_error.is_some()
    }

    /// Success screen data, once an upload succeeded
    pub fn result_view(&self) -> Option<ResultView> {
        self.result
            .as_ref()
            .map(|result| ResultView::new(result, &self.metadata))
    }

    /// Structural invariants: payload iff a payload mode, preview iff payload,
    /// stream only while live, result iff succeeded
    pub fn invariants_hold(&self) -> bool {
        self.payload.is_some() == self.mode.holds_payload()
            && self.preview.is_some() == self.payload.is_some()
            && (self.stream.is_none() || self.mode == Mode::Live)
            && self.result.is_some() == (self.mode == Mode::Succeeded)
    }

    fn abandon_attempt(&mut self, attempt: u64) -> bool {
        if attempt != self.attempt || self.mode != Mode::Uploading {
            return false;
        }
        warn!("Upload attempt {} abandoned before it finished", attempt);
        self.last_error = Some(UPLOAD_CANCELLED.to_string());
        self.mode = Mode::Preview;
        self.check_invariants();
        true
    }

    async fn start_camera(&mut self) {
        self.release_camera();
        self.mode = Mode::Acquiring;

        match StreamGuard::acquire(self.camera.as_ref(), &self.config.constraints).await {
            Ok(stream) => {
                self.stream = Some(stream);
                self.mode = Mode::Live;
            }
            Err(e) => {
                warn!("Camera unavailable: {}", e);
                self.last_error = Some(e.user_message());
            }
        }

        self.check_invariants();
    }

    fn release_camera(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.release();
        }
    }

    fn set_payload(&mut self, payload: ImagePayload) {
        // Revoke the old reference before registering the new one
        self.preview = None;
        self.preview = Some(self.previews.register(&payload));
        self.payload = Some(payload);
    }

    fn clear_payload(&mut self) {
        self.preview = None;
        self.payload = None;
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    fn check_invariants(&self) {
        debug_assert!(
            self.invariants_hold(),
            "capture session invariants violated while {}",
            self.mode
        );
    }
}

/// Reverts an in-flight attempt to `Preview` unless its outcome is applied
struct AttemptGuard<'a> {
    session: Option<&'a mut CaptureSession>,
    attempt: u64,
}

impl AttemptGuard<'_> {
    fn complete(
        mut self,
        ticket: UploadTicket,
        outcome: Result<UploadResult, UploadError>,
    ) -> Result<(), SessionError> {
        match self.session.take() {
            Some(session) => session.complete_submit(ticket, outcome),
            None => Err(SessionError::StaleResult),
        }
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.abandon_attempt(self.attempt);
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release_camera();
        self.preview = None;
        if self.mode == Mode::Uploading {
            info!(
                "Session {} closed with attempt {} in flight; its outcome will be ignored",
                self.id, self.attempt
            );
        }
        self.emit(SessionEvent::Closed {
            session_id: self.id,
        });
        info!("Capture session {} closed", self.id);
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("stream", &self.stream)
            .field("payload_bytes", &self.payload.as_ref().map(ImagePayload::len))
            .field("preview", &self.preview_url())
            .field("last_error", &self.last_error)
            .field("attempt", &self.attempt)
            .finish()
    }
}
