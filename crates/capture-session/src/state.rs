//! Session mode

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a capture session is in its lifecycle.
///
/// The no-camera state is `Acquiring` with no stream held and the error slot
/// set; the file-pick fallback stays available from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Waiting for (or denied) the camera
    #[default]
    Acquiring,
    /// Camera stream open, showing live video
    Live,
    /// Still image held, waiting for submit or retake
    Preview,
    /// Submission in flight
    Uploading,
    /// Server returned extracted data
    Succeeded,
}

impl Mode {
    /// Modes in which the session must hold an image payload
    pub fn holds_payload(self) -> bool {
        matches!(self, Mode::Preview | Mode::Uploading | Mode::Succeeded)
    }

    /// A live frame can be snapshotted
    pub fn can_capture(self) -> bool {
        self == Mode::Live
    }

    /// A gallery file may replace the camera
    pub fn can_pick_file(self) -> bool {
        matches!(self, Mode::Acquiring | Mode::Live)
    }

    /// A held image may be sent
    pub fn can_submit(self) -> bool {
        self == Mode::Preview
    }

    /// The image (and any result) may be discarded
    pub fn can_retake(self) -> bool {
        matches!(self, Mode::Preview | Mode::Succeeded)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Acquiring => "acquiring",
            Mode::Live => "live",
            Mode::Preview => "previewing",
            Mode::Uploading => "uploading",
            Mode::Succeeded => "succeeded",
        };
        f.write_str(name)
    }
}
