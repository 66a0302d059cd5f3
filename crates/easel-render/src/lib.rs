pub mod compositor;
pub mod error;
pub mod export;
pub mod snapshot;
pub mod source;
pub mod surface;

pub use compositor::{DecodedImage, FitRect, composite, fit_rect, load_into};
pub use error::{DataUrlError, EncodeError, ImageLoadError};
pub use export::{BLANK_DATA_URL, data_url_bytes, decode_data_url, encode_data_url};
pub use snapshot::{Snapshot, SnapshotStore};
pub use source::{FetchMode, FetchedImage, ImageSource};
pub use surface::RasterSurface;
