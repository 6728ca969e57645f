// src/core/imaging.rs
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use image::DynamicImage;
use thiserror::Error;

const DATA_URL_PREFIX: &str = "data:image/";
const BASE64_MARKER: &str = ";base64,";

// Browsers sometimes drop padding on canvas exports.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error, PartialEq)]
pub enum ImageError {
    #[error("No image received")]
    Missing,

    #[error("Image is not valid base64: {0}")]
    Encoding(String),

    #[error("Image could not be decoded: {0}")]
    Decode(String),
}

/// Decodes a `data:image/<type>;base64,<payload>` string, or a bare base64
/// payload, into raw image bytes.
pub fn decode_data_url(image: Option<&str>) -> Result<Vec<u8>, ImageError> {
    let encoded = image.map(str::trim).unwrap_or_default();
    if encoded.is_empty() {
        return Err(ImageError::Missing);
    }

    let payload: String = strip_data_url_prefix(encoded)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if payload.is_empty() {
        return Err(ImageError::Missing);
    }

    LENIENT_BASE64
        .decode(payload.as_bytes())
        .map_err(|e| ImageError::Encoding(e.to_string()))
}

fn strip_data_url_prefix(image: &str) -> &str {
    if let Some(rest) = image.strip_prefix(DATA_URL_PREFIX) {
        if let Some((subtype, payload)) = rest.split_once(BASE64_MARKER) {
            let valid_subtype = !subtype.is_empty()
                && subtype.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if valid_subtype {
                return payload;
            }
        }
    }
    image
}

/// Decodes raw bytes (PNG, JPEG, WebP, BMP, GIF) into a raster image.
pub fn decode_raster(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::Missing);
    }
    image::load_from_memory(bytes).map_err(|e| ImageError::Decode(e.to_string()))
}
