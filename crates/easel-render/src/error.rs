/// Fetching or decoding a source image failed. The surface is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum ImageLoadError {
    #[error("failed to fetch image '{url}': {reason}")]
    Fetch { url: String, reason: String },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

/// Exporting the buffer failed.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The buffer holds cross-origin pixels that were not loaded in anonymous mode.
    #[error("canvas is tainted by cross-origin image data and cannot be exported")]
    Tainted,
    #[error("PNG encoding failed: {0}")]
    Png(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DataUrlError {
    #[error("URL does not start with 'data:'")]
    MissingPrefix,
    #[error("missing comma in data URL")]
    MissingComma,
    #[error("data URL is not base64 encoded")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid PNG payload: {0}")]
    Png(String),
}
