//! Background reference image decoding.
//!
//! Only `data:` URLs are decoded here; remote URLs are resolved by the
//! host (the browser bridge loads them through an `<img>` element).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackgroundError {
    #[error("not a data: URL")]
    NotDataUrl,
    #[error("data: URL is not base64 encoded")]
    NotBase64,
    #[error("base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image decode: {0}")]
    Image(#[from] image::ImageError),
}

/// Decoded RGBA8 pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<Vec<u8>>,
}

pub fn is_data_url(url: &str) -> bool {
    url.starts_with("data:")
}

/// Decode `data:image/...;base64,<payload>` into RGBA8.
pub fn decode_data_url(url: &str) -> Result<BackgroundImage, BackgroundError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or(BackgroundError::NotDataUrl)?;
    let (meta, payload) = rest.split_once(',').ok_or(BackgroundError::NotBase64)?;
    if !meta.ends_with(";base64") {
        return Err(BackgroundError::NotBase64);
    }
    let bytes = STANDARD.decode(payload.trim())?;
    let img = image::load_from_memory(&bytes)?.to_rgba8();
    let (width, height) = img.dimensions();
    log::debug!("decoded background {width}x{height}");
    Ok(BackgroundImage {
        width,
        height,
        rgba: Arc::new(img.into_raw()),
    })
}
