//! Session configuration

use camera_capture::StreamConstraints;

/// Capture session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Constraints for camera acquisition
    pub constraints: StreamConstraints,

    /// Still resolution used when the live stream has not reported its size
    pub default_resolution: (u32, u32),
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            constraints: StreamConstraints::document(),
            default_resolution: (1280, 720),
        }
    }
}

impl SessionConfig {
    /// Default config with a different fallback still resolution
    pub fn with_default_resolution(width: u32, height: u32) -> Self {
        Self {
            default_resolution: (width.max(1), height.max(1)),
            ..Default::default()
        }
    }
}
