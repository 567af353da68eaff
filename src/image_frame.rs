//! Base image coordinate space.

use std::io::Cursor;

use image::ImageReader;

use crate::error::SyncError;
use crate::model::Point;

/// URL and pixel dimensions of a folder's base image.
///
/// Features are placed in this image's pixel space; nothing can be rendered
/// before a frame is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFrame {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl ImageFrame {
    pub fn new(url: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            url: url.into(),
            width,
            height,
        }
    }

    /// Read the dimensions from encoded image bytes without decoding pixels.
    pub fn from_image_bytes(url: impl Into<String>, bytes: &[u8]) -> Result<Self, SyncError> {
        let (width, height) = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| SyncError::validation(format!("Unreadable base image: {}", e)))?
            .into_dimensions()
            .map_err(|e| SyncError::validation(format!("Unreadable base image: {}", e)))?;
        Ok(Self::new(url, width, height))
    }

    /// Whether a point lies inside the image bounds.
    pub fn contains(&self, point: Point) -> bool {
        point.is_finite()
            && point.x >= 0.0
            && point.y >= 0.0
            && point.x <= self.width as f32
            && point.y <= self.height as f32
    }
}
