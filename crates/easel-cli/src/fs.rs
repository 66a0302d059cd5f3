//! Filesystem-backed image source and image store.

use easel_core::Timestamp;
use easel_editor::{ImageStore, PersistenceError};
use easel_render::{FetchMode, FetchedImage, ImageLoadError, ImageSource, data_url_bytes};
use std::path::{Path, PathBuf};

/// Reads images from paths relative to a base directory.
#[derive(Debug, Clone)]
pub struct FileSource {
    base: PathBuf,
}

impl FileSource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl ImageSource for FileSource {
    async fn fetch(&self, url: &str, _mode: FetchMode) -> Result<FetchedImage, ImageLoadError> {
        let path = self.base.join(url);
        let bytes = tokio::fs::read(&path).await.map_err(|e| ImageLoadError::Fetch {
            url: path.display().to_string(),
            reason: e.to_string(),
        })?;
        // Local files share the page's origin.
        Ok(FetchedImage::clean(bytes))
    }
}

/// Writes saved canvases to `<root>/images/<millis>.png`.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn free_path(dir: &Path) -> Result<PathBuf, PersistenceError> {
        let stamp = Timestamp::now().0;
        for attempt in 0u32.. {
            let name = match attempt {
                0 => format!("{stamp}.png"),
                n => format!("{stamp}-{n}.png"),
            };
            let path = dir.join(name);
            let taken = tokio::fs::try_exists(&path)
                .await
                .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
            if !taken {
                return Ok(path);
            }
        }
        Err(PersistenceError::Rejected("no free file name".into()))
    }
}

impl ImageStore for DirectoryStore {
    async fn save(&self, encoded_image: &str) -> Result<String, PersistenceError> {
        let (media_type, bytes) =
            data_url_bytes(encoded_image).map_err(|e| PersistenceError::Rejected(e.to_string()))?;
        if media_type != "image/png" {
            return Err(PersistenceError::Rejected(format!(
                "unsupported media type '{media_type}'"
            )));
        }

        let dir = self.root.join("images");
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        let path = Self::free_path(&dir).await?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        log::debug!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path.display().to_string())
    }
}
