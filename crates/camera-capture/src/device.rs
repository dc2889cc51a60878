//! Camera device capability
//!
//! The session never talks to hardware directly. It asks a [`CameraProvider`]
//! for a stream and holds the result in a [`StreamGuard`], which stops the
//! stream when released or dropped.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::{CameraError, VideoFrame};

/// Which way the requested camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    /// Rear camera, pointing away from the user (documents, receipts)
    #[default]
    Environment,
    /// Front camera, pointing at the user
    User,
}

/// Constraints passed to [`CameraProvider::acquire`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    /// Preferred facing mode
    pub facing: FacingMode,
    /// When false the facing mode is a preference and any camera may be used
    pub require_facing: bool,
    /// Capture audio alongside video
    pub audio: bool,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            facing: FacingMode::Environment,
            require_facing: false,
            audio: false,
        }
    }
}

impl StreamConstraints {
    /// Rear camera preferred, video only
    pub fn document() -> Self {
        Self::default()
    }
}

/// Source of camera streams (platform camera API or a test double)
#[async_trait]
pub trait CameraProvider: Send + Sync {
    /// Request a live stream. Denial and absence are reported as distinct
    /// errors and are never retried here.
    async fn acquire(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraError>;
}

/// One open live stream
pub trait CameraStream: Send {
    /// Human-readable device label
    fn label(&self) -> &str;

    /// Native frame size, `None` until the stream has negotiated it
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Current live frame, `None` when no decodable frame is available
    fn snapshot(&mut self) -> Option<VideoFrame>;

    /// Stop all tracks. Must be idempotent.
    fn stop(&mut self);
}

/// Exclusive owner of an open camera stream.
///
/// Dropping the guard stops the stream, so every exit path releases the
/// camera, including error paths and session teardown.
pub struct StreamGuard {
    stream: Box<dyn CameraStream>,
}

impl StreamGuard {
    /// Acquire a stream from `provider` and wrap it
    pub async fn acquire(
        provider: &dyn CameraProvider,
        constraints: &StreamConstraints,
    ) -> Result<Self, CameraError> {
        let stream = provider.acquire(constraints).await?;
        info!(
            "Camera stream acquired: {} ({:?})",
            stream.label(),
            constraints.facing
        );
        Ok(Self { stream })
    }

    /// Device label
    pub fn label(&self) -> &str {
        self.stream.label()
    }

    /// Native frame size if known
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.stream.dimensions()
    }

    /// Current live frame
    pub fn snapshot(&mut self) -> Option<VideoFrame> {
        self.stream.snapshot()
    }

    /// Stop the stream now
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.stream.stop();
        debug!("Camera stream released: {}", self.stream.label());
    }
}

impl std::fmt::Debug for StreamGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamGuard")
            .field("label", &self.stream.label())
            .field("dimensions", &self.stream.dimensions())
            .finish()
    }
}
