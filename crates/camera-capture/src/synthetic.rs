//! Synthetic camera for tests and hosts without camera hardware
//!
//! Produces a deterministic gradient and keeps counters of acquisitions and
//! releases so callers can assert that no stream is leaked.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::{CameraError, CameraProvider, CameraStream, FacingMode, StreamConstraints, VideoFrame};

/// How the synthetic camera answers acquisition requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticBehavior {
    /// Grant a stream producing `width` x `height` frames
    Granted {
        width: u32,
        height: u32,
        /// Whether the stream reports its dimensions
        report_dimensions: bool,
        /// Whether snapshots return a decodable frame
        frames: bool,
    },
    /// User denied the permission prompt
    Denied,
    /// No camera on this device
    Absent,
}

/// Acquisition/release counters shared between the camera and its streams
#[derive(Debug, Default)]
pub struct SyntheticStats {
    acquisitions: AtomicUsize,
    releases: AtomicUsize,
    open: AtomicUsize,
    peak_open: AtomicUsize,
}

impl SyntheticStats {
    /// Streams handed out so far
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// Streams stopped so far
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Streams currently open
    pub fn open_streams(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open streams observed
    pub fn peak_open_streams(&self) -> usize {
        self.peak_open.load(Ordering::SeqCst)
    }

    fn opened(&self) {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        let now = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_open.fetch_max(now, Ordering::SeqCst);
    }

    fn closed(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Camera provider that never touches hardware
#[derive(Debug)]
pub struct SyntheticCamera {
    behavior: Mutex<SyntheticBehavior>,
    stats: Arc<SyntheticStats>,
}

impl SyntheticCamera {
    /// Camera granting `width` x `height` streams
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_behavior(SyntheticBehavior::Granted {
            width,
            height,
            report_dimensions: true,
            frames: true,
        })
    }

    /// Camera whose permission prompt is always denied
    pub fn denied() -> Self {
        Self::with_behavior(SyntheticBehavior::Denied)
    }

    /// Device without a camera
    pub fn absent() -> Self {
        Self::with_behavior(SyntheticBehavior::Absent)
    }

    /// Camera with explicit behavior
    pub fn with_behavior(behavior: SyntheticBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            stats: Arc::new(SyntheticStats::default()),
        }
    }

    /// Change how later acquisitions are answered
    pub fn set_behavior(&self, behavior: SyntheticBehavior) {
        *self.behavior.lock().unwrap_or_else(|e| e.into_inner()) = behavior;
    }

    /// Shared counters
    pub fn stats(&self) -> Arc<SyntheticStats> {
        Arc::clone(&self.stats)
    }

    fn behavior(&self) -> SyntheticBehavior {
        *self.behavior.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

#[async_trait]
impl CameraProvider for SyntheticCamera {
    async fn acquire(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraError> {
        if constraints.audio {
            warn!("Synthetic camera ignores audio request");
        }
        // Only an environment-facing lens exists; a preference for the user
        // camera falls back to it, a requirement cannot be met
        if constraints.require_facing && constraints.facing != FacingMode::Environment {
            return Err(CameraError::NotFound(format!(
                "no {:?}-facing camera",
                constraints.facing
            )));
        }

        match self.behavior() {
            SyntheticBehavior::Denied => Err(CameraError::PermissionDenied(
                "permission prompt dismissed".to_string(),
            )),
            SyntheticBehavior::Absent => Err(CameraError::NotFound(format!(
                "no {:?}-facing camera",
                constraints.facing
            ))),
            SyntheticBehavior::Granted {
                width,
                height,
                report_dimensions,
                frames,
            } => {
                self.stats.opened();
                debug!("Synthetic stream opened ({}x{})", width, height);
                Ok(Box::new(SyntheticStream {
                    width,
                    height,
                    report_dimensions,
                    frames,
                    sequence: 0,
                    stopped: false,
                    stats: Arc::clone(&self.stats),
                }))
            }
        }
    }
}

struct SyntheticStream {
    width: u32,
    height: u32,
    report_dimensions: bool,
    frames: bool,
    sequence: u32,
    stopped: bool,
    stats: Arc<SyntheticStats>,
}

impl CameraStream for SyntheticStream {
    fn label(&self) -> &str {
        "synthetic-environment-camera"
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.report_dimensions.then_some((self.width, self.height))
    }

    fn snapshot(&mut self) -> Option<VideoFrame> {
        if self.stopped || !self.frames {
            return None;
        }
        self.sequence += 1;

        let mut data = Vec::with_capacity((self.width as usize) * (self.height as usize) * 3);
        for y in 0..self.height {
            for x in 0..self.width {
                let r = (x * 255 / self.width.max(1)) as u8;
                let g = (y * 255 / self.height.max(1)) as u8;
                let b = (self.sequence % 255) as u8;
                data.extend_from_slice(&[r, g, b]);
            }
        }

        Some(VideoFrame::new(
            data,
            self.width,
            self.height,
            u64::from(self.sequence) * 33_000_000,
            self.sequence,
        ))
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.stats.closed();
        }
    }
}

impl Drop for SyntheticStream {
    fn drop(&mut self) {
        self.stop();
    }
}
