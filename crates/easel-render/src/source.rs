//! Where source images come from.
//!
//! The compositor never performs I/O itself; the host supplies an
//! [`ImageSource`] (browser fetch, filesystem, test fixture).

use crate::error::ImageLoadError;

/// Cross-origin request mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// CORS request without credentials. Keeps the buffer exportable.
    Anonymous,
    /// Opaque request. Pixels from a foreign origin taint the buffer.
    NoCors,
}

/// Raw bytes of a fetched image plus its provenance.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    /// `false` when the response was opaque cross-origin data.
    pub origin_clean: bool,
}

impl FetchedImage {
    pub fn clean(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            origin_clean: true,
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait ImageSource {
    async fn fetch(&self, url: &str, mode: FetchMode) -> Result<FetchedImage, ImageLoadError>;
}
