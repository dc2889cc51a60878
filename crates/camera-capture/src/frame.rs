//! Live video frames and still rendering

use image::{ImageFormat, RgbImage};
use std::io::Cursor;

use crate::CameraError;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// A frame can be rendered when it has a non-zero size and a full RGB buffer
    pub fn is_decodable(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len() == (self.width as usize) * (self.height as usize) * 3
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        self.data
            .get(idx..idx + 3)
            .map(|p| [p[0], p[1], p[2]])
    }

    /// Resize frame (nearest neighbour)
    pub fn resize(&self, new_width: u32, new_height: u32) -> VideoFrame {
        let mut resized = Vec::with_capacity((new_width as usize) * (new_height as usize) * 3);

        let x_ratio = self.width as f32 / new_width.max(1) as f32;
        let y_ratio = self.height as f32 / new_height.max(1) as f32;

        for y in 0..new_height {
            for x in 0..new_width {
                let x0 = (x as f32 * x_ratio).floor() as u32;
                let y0 = (y as f32 * y_ratio).floor() as u32;

                let pixel = self
                    .get_pixel(
                        x0.min(self.width.saturating_sub(1)),
                        y0.min(self.height.saturating_sub(1)),
                    )
                    .unwrap_or([0, 0, 0]);
                resized.extend_from_slice(&pixel);
            }
        }

        VideoFrame {
            data: resized,
            width: new_width,
            height: new_height,
            timestamp_ns: self.timestamp_ns,
            sequence: self.sequence,
        }
    }

    /// Draw the frame onto a `width` x `height` canvas and encode it as PNG.
    ///
    /// Returns `Ok(None)` when the frame has nothing to render.
    pub fn render_png(&self, width: u32, height: u32) -> Result<Option<Vec<u8>>, CameraError> {
        if !self.is_decodable() || width == 0 || height == 0 {
            return Ok(None);
        }

        let canvas = if (self.width, self.height) == (width, height) {
            self.clone()
        } else {
            self.resize(width, height)
        };

        let img = RgbImage::from_raw(canvas.width, canvas.height, canvas.data)
            .ok_or_else(|| CameraError::Encode("frame buffer does not match canvas".to_string()))?;

        let mut png = Cursor::new(Vec::new());
        img.write_to(&mut png, ImageFormat::Png)
            .map_err(|e| CameraError::Encode(e.to_string()))?;

        Ok(Some(png.into_inner()))
    }
}
