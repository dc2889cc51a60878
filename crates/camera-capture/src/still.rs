//! Still-image payloads
//!
//! A payload is the single image a scan attempt submits: either a PNG rendered
//! from a live frame or the bytes of a file the user picked.

use image::ImageFormat;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::{CameraError, VideoFrame};

/// Media type of stills rendered from the camera
pub const SNAPSHOT_MEDIA_TYPE: &str = "image/png";

/// Binary image plus declared media type.
///
/// Bytes are shared (`Arc<[u8]>`) so handing a snapshot to an in-flight upload
/// does not copy the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    bytes: Arc<[u8]>,
    media_type: String,
    file_name: Option<String>,
}

impl ImagePayload {
    /// Render a live frame at `width` x `height` and wrap it as a PNG payload.
    ///
    /// Returns `Ok(None)` when the frame cannot be rendered.
    pub fn from_frame(
        frame: &VideoFrame,
        width: u32,
        height: u32,
    ) -> Result<Option<Self>, CameraError> {
        let Some(png) = frame.render_png(width, height)? else {
            return Ok(None);
        };
        debug!(
            "Rendered frame #{} at {}x{} ({} bytes)",
            frame.sequence,
            width,
            height,
            png.len()
        );
        Ok(Some(Self {
            bytes: png.into(),
            media_type: SNAPSHOT_MEDIA_TYPE.to_string(),
            file_name: None,
        }))
    }

    /// Wrap bytes of a picked file. Any `image/*` media type is accepted.
    pub fn from_file_bytes(
        file_name: Option<String>,
        media_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Self, CameraError> {
        let media_type = media_type.trim().to_ascii_lowercase();
        if !media_type.starts_with("image/") {
            return Err(CameraError::UnsupportedMedia(media_type));
        }
        Ok(Self {
            bytes: bytes.into(),
            media_type,
            file_name,
        })
    }

    /// Load a picked file from disk, detecting the media type from its extension
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, CameraError> {
        let path = path.as_ref();
        let format = ImageFormat::from_path(path)
            .map_err(|_| CameraError::UnsupportedMedia(path.display().to_string()))?;
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        Self::from_file_bytes(file_name, format.to_mime_type(), bytes)
    }

    /// Raw bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the raw bytes
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    /// Declared media type (e.g. `image/png`)
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Original file name when the payload came from a named file
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when there are no bytes to submit
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
