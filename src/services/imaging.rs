//! Image Normalization
//!
//! PNG conversion for screenshots in formats vision providers reject.

use std::io::Cursor;

use game_advisor_core::{AdvisorError, AdvisorResult, ImageData};
use image::ImageFormat;

/// MIME types every built-in provider accepts as-is
const PROVIDER_NATIVE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

/// Return `image` as PNG.
///
/// An image that is already PNG is returned unchanged without re-encoding.
pub fn ensure_png(image: ImageData) -> AdvisorResult<ImageData> {
    if image.is_png() {
        return Ok(image);
    }

    let decoded = image::load_from_memory(image.bytes()).map_err(|e| {
        AdvisorError::validation(format!(
            "Could not decode {} image: {}",
            image.mime_type(),
            e
        ))
    })?;

    let mut buffer = Cursor::new(Vec::new());
    decoded
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| AdvisorError::internal(format!("PNG encoding failed: {}", e)))?;

    tracing::debug!(
        "[Imaging] Converted {} ({} bytes) to PNG ({} bytes)",
        image.mime_type(),
        image.len(),
        buffer.get_ref().len()
    );

    ImageData::new(buffer.into_inner(), "image/png")
}

/// Convert only when the provider would not accept the format.
pub fn prepare_for_provider(image: ImageData) -> AdvisorResult<ImageData> {
    if PROVIDER_NATIVE_TYPES.contains(&image.mime_type()) {
        Ok(image)
    } else {
        ensure_png(image)
    }
}
