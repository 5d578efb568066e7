//! Image Value
//!
//! Validated screenshot bytes plus MIME type. Construction fails on empty
//! bytes or a MIME type outside `image/*`, so every `ImageData` that exists
//! is safe to hand to a provider.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, AdvisorResult};

/// PNG file signature prefix used for classification.
const PNG_MAGIC: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];

/// A validated, immutable image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    bytes: Vec<u8>,
    mime_type: String,
}

impl ImageData {
    /// Create an image from raw bytes and an explicit MIME type.
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> AdvisorResult<Self> {
        let mime_type = mime_type.into();
        if bytes.is_empty() {
            return Err(AdvisorError::validation("Image data cannot be empty"));
        }
        if !mime_type.trim().to_lowercase().starts_with("image/") {
            return Err(AdvisorError::validation(format!(
                "Invalid image MIME type '{}': must start with 'image/'",
                mime_type
            )));
        }
        Ok(Self {
            bytes,
            mime_type: mime_type.trim().to_lowercase(),
        })
    }

    /// Create an image by sniffing the MIME type from its contents, falling
    /// back to the file extension of `filename_hint`.
    pub fn from_bytes(bytes: Vec<u8>, filename_hint: Option<&str>) -> AdvisorResult<Self> {
        if bytes.is_empty() {
            return Err(AdvisorError::validation("Image data cannot be empty"));
        }
        let mime = sniff_mime_type(&bytes)
            .or_else(|| filename_hint.and_then(mime_from_extension))
            .ok_or_else(|| {
                AdvisorError::validation(match filename_hint {
                    Some(name) => format!("Unsupported image format: {}", name),
                    None => "Unsupported image format".to_string(),
                })
            })?;
        Self::new(bytes, mime)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_png(&self) -> bool {
        self.mime_type == "image/png"
    }

    /// Standard base64 of the raw bytes, as providers expect in content parts.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    /// `data:` URI form used by OpenAI-style `image_url` parts.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

/// Classify image bytes by their magic number.
pub fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() >= 4 && bytes[..4] == PNG_MAGIC {
        return Some("image/png");
    }
    if bytes.len() >= 3 && bytes[..3] == [0xFF, 0xD8, 0xFF] {
        return Some("image/jpeg");
    }
    if bytes.len() >= 4 && &bytes[..4] == b"GIF8" {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.len() >= 2 && &bytes[..2] == b"BM" {
        return Some("image/bmp");
    }
    None
}

/// Map a file name's extension to an image MIME type.
pub fn mime_from_extension(filename: &str) -> Option<&'static str> {
    let ext = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())?
        .to_lowercase();

    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}
