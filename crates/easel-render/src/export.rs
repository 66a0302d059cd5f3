//! PNG data URL encoding and decoding.
//!
//! The exported artifact is always `data:image/png;base64,<payload>` built
//! from the live buffer. Decoding is used by stores that persist the bytes
//! and by tests that inspect what was exported.

use crate::error::{DataUrlError, EncodeError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tiny_skia::Pixmap;

const DATA_URL_PREFIX: &str = "data:";
const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// What a browser canvas returns from `toDataURL()` when it has no pixels.
pub const BLANK_DATA_URL: &str = "data:,";

/// Encode a pixmap as a base64 PNG data URL.
pub fn encode_data_url(pixmap: &Pixmap) -> Result<String, EncodeError> {
    let png = pixmap
        .encode_png()
        .map_err(|e| EncodeError::Png(e.to_string()))?;
    let mut url = String::with_capacity(PNG_DATA_URL_PREFIX.len() + png.len() * 4 / 3 + 4);
    url.push_str(PNG_DATA_URL_PREFIX);
    STANDARD.encode_string(&png, &mut url);
    Ok(url)
}

/// Split a base64 data URL into its media type and decoded bytes.
pub fn data_url_bytes(url: &str) -> Result<(String, Vec<u8>), DataUrlError> {
    let rest = url
        .strip_prefix(DATA_URL_PREFIX)
        .ok_or(DataUrlError::MissingPrefix)?;
    let (metadata, data) = rest.split_once(',').ok_or(DataUrlError::MissingComma)?;

    let mut parts = metadata.split(';');
    let media_type = parts.next().unwrap_or("").trim().to_string();
    if !parts.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return Err(DataUrlError::NotBase64);
    }

    let bytes = STANDARD.decode(data.trim())?;
    Ok((media_type, bytes))
}

/// Decode a PNG data URL back into a pixmap.
pub fn decode_data_url(url: &str) -> Result<Pixmap, DataUrlError> {
    let (_, bytes) = data_url_bytes(url)?;
    Pixmap::decode_png(&bytes).map_err(|e| DataUrlError::Png(e.to_string()))
}
