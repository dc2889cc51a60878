//! Camera Capture Library for Document Scanning
//!
//! Provides the camera device capability used by the capture session:
//! - Environment-facing camera acquisition with guaranteed release
//! - Live frame snapshots rendered into still images
//! - Still-image payloads from snapshots or picked gallery files
//! - Synthetic camera for tests and hosts without camera hardware

pub mod device;
pub mod frame;
pub mod still;
pub mod synthetic;

pub use device::{CameraProvider, CameraStream, FacingMode, StreamConstraints, StreamGuard};
pub use frame::VideoFrame;
pub use still::{ImagePayload, SNAPSHOT_MEDIA_TYPE};
pub use synthetic::{SyntheticBehavior, SyntheticCamera, SyntheticStats};

use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera access denied: {0}")]
    PermissionDenied(String),

    #[error("No camera available: {0}")]
    NotFound(String),

    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Image encoding failed: {0}")]
    Encode(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("Failed to read image file: {0}")]
    Io(#[from] std::io::Error),
}

impl CameraError {
    /// True when the camera itself could not be obtained (denied, absent or
    /// failed to open). The file-pick fallback stays available in that case.
    pub fn is_device_unavailable(&self) -> bool {
        matches!(
            self,
            CameraError::PermissionDenied(_) | CameraError::NotFound(_) | CameraError::Open(_)
        )
    }

    /// Message shown to the user in the session error slot.
    pub fn user_message(&self) -> String {
        match self {
            CameraError::PermissionDenied(_)
            | CameraError::NotFound(_)
            | CameraError::Open(_) => {
                "Camera access denied or unavailable. You can upload a photo from your gallery."
                    .to_string()
            }
            CameraError::UnsupportedMedia(media_type) => {
                format!("Selected file is not an image ({media_type}).")
            }
            CameraError::Encode(_) => "Could not capture a still image.".to_string(),
            CameraError::Io(e) => format!("Could not read the selected file: {e}"),
        }
    }
}
