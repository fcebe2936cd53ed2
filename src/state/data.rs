/// Shared data structures for the editor session
///
/// These structs represent the data model that flows between
/// the photo service, the renderers and the UI layer.

use image::RgbaImage;

use crate::error::{EditorError, EditorResult};

/// The decoded original an editor session was opened with.
///
/// Never mutated: every edit is computed on demand from this raster plus the
/// current `EditState`.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Photo identifier at the photo service
    pub photo_id: String,
    /// Decoded RGBA8 pixels
    pixels: RgbaImage,
}

impl SourceImage {
    pub fn new(photo_id: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            photo_id: photo_id.into(),
            pixels,
        }
    }

    /// Decode encoded image bytes (JPEG, PNG, ...) into a source image
    pub fn decode(photo_id: impl Into<String>, bytes: &[u8]) -> EditorResult<Self> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| EditorError::load(format!("Failed to decode image: {}", e)))?;
        let pixels = decoded.to_rgba8();
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(EditorError::load("Decoded image is empty"));
        }
        Ok(Self::new(photo_id, pixels))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}
