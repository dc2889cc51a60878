//! Capture Session
//!
//! One scan attempt, from opening the camera to displaying the extracted data:
//! - Camera ownership with guaranteed release
//! - Capture / file-pick / retake / submit state machine
//! - Display-only preview handles with scoped lifetime
//! - Shared handle for hosts that close the session while an upload is in flight
//! - Result view shaping for the success screen

pub mod config;
pub mod handle;
pub mod preview;
pub mod session;
pub mod state;
pub mod view;

pub use config::SessionConfig;
pub use handle::{SessionHandle, SessionStatus};
pub use preview::{PreviewHandle, PreviewImage, PreviewRegistry};
pub use session::{CaptureSession, SessionEvent, UploadTicket, UPLOAD_CANCELLED};
pub use state::Mode;
pub use view::{Field, ProductCard, ResultView};

use thiserror::Error;
use upload_client::UploadError;

/// Session error types
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("An upload is already in progress")]
    Busy,

    #[error("Cannot {action} while {mode}")]
    InvalidTransition { action: &'static str, mode: Mode },

    #[error("Upload result belongs to an attempt that is no longer in flight")]
    StaleResult,

    #[error("Session is closed")]
    Closed,

    #[error("Upload task failed: {0}")]
    Task(String),
}
