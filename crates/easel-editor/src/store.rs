//! Persistence contracts.
//!
//! The session only needs [`ImageStore::save`]. [`WorkStore`] covers the
//! gallery side: records that point at saved images, paged per user.
//! [`MemoryStore`] implements both for tests and headless runs.

use easel_core::{Timestamp, WorkDraft, WorkId, WorkPatch, WorkRecord};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Page size used by the gallery.
pub const DEFAULT_PAGE_SIZE: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    #[error("persistence backend unavailable: {0}")]
    Unavailable(String),
    #[error("persistence backend rejected the request: {0}")]
    Rejected(String),
    #[error("work '{0}' not found")]
    NotFound(WorkId),
}

/// Stores an encoded canvas image and returns a reference URL for it.
#[allow(async_fn_in_trait)]
pub trait ImageStore {
    async fn save(&self, encoded_image: &str) -> Result<String, PersistenceError>;
}

/// Stores work records.
///
/// Pages are 1-based. A page past the end is empty rather than an error.
#[allow(async_fn_in_trait)]
pub trait WorkStore {
    async fn create(
        &self,
        draft: WorkDraft,
        image_url: String,
    ) -> Result<WorkRecord, PersistenceError>;
    async fn update(&self, id: &WorkId, patch: WorkPatch) -> Result<WorkRecord, PersistenceError>;
    /// Remove the record and the image it references.
    async fn delete(&self, id: &WorkId) -> Result<(), PersistenceError>;
    async fn fetch(&self, id: &WorkId) -> Result<WorkRecord, PersistenceError>;
    async fn fetch_page(
        &self,
        user_id: Option<&str>,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<WorkRecord>, PersistenceError>;
    async fn fetch_count(&self, user_id: Option<&str>) -> Result<usize, PersistenceError>;
}

// ─── In-memory store ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Inner {
    /// Reference URL → encoded image.
    images: HashMap<String, String>,
    /// Insertion order is listing order.
    works: Vec<WorkRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    next_image: AtomicU64,
    next_work: AtomicU64,
    fail_next_save: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `save` fail with [`PersistenceError::Unavailable`].
    pub fn fail_next_save(&self) {
        self.fail_next_save.store(true, Ordering::SeqCst);
    }

    /// Encoded image stored under `url`, if any.
    pub fn image(&self, url: &str) -> Option<String> {
        self.lock().images.get(url).cloned()
    }

    pub fn image_count(&self) -> usize {
        self.lock().images.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn matching<'a>(
        works: &'a [WorkRecord],
        user_id: Option<&'a str>,
    ) -> impl Iterator<Item = &'a WorkRecord> {
        works
            .iter()
            .filter(move |w| user_id.is_none_or(|uid| w.user_id == uid))
    }
}

impl ImageStore for MemoryStore {
    async fn save(&self, encoded_image: &str) -> Result<String, PersistenceError> {
        if self.fail_next_save.swap(false, Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("injected failure".into()));
        }
        if encoded_image.is_empty() {
            return Err(PersistenceError::Rejected("empty image".into()));
        }
        let n = self.next_image.fetch_add(1, Ordering::SeqCst) + 1;
        let url = format!("memory://images/{n}.png");
        self.lock().images.insert(url.clone(), encoded_image.to_string());
        log::debug!("stored image {url} ({} bytes)", encoded_image.len());
        Ok(url)
    }
}

impl WorkStore for MemoryStore {
    async fn create(
        &self,
        draft: WorkDraft,
        image_url: String,
    ) -> Result<WorkRecord, PersistenceError> {
        let n = self.next_work.fetch_add(1, Ordering::SeqCst) + 1;
        let id = WorkId(format!("work-{n}"));
        let record = WorkRecord::from_draft(id, draft, image_url, Timestamp::now());
        self.lock().works.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &WorkId, patch: WorkPatch) -> Result<WorkRecord, PersistenceError> {
        let mut inner = self.lock();
        let record = inner
            .works
            .iter_mut()
            .find(|w| &w.id == id)
            .ok_or_else(|| PersistenceError::NotFound(id.clone()))?;
        record.apply(patch, Timestamp::now());
        Ok(record.clone())
    }

    async fn delete(&self, id: &WorkId) -> Result<(), PersistenceError> {
        let mut inner = self.lock();
        let pos = inner
            .works
            .iter()
            .position(|w| &w.id == id)
            .ok_or_else(|| PersistenceError::NotFound(id.clone()))?;
        let record = inner.works.remove(pos);
        inner.images.remove(&record.image_url);
        Ok(())
    }

    async fn fetch(&self, id: &WorkId) -> Result<WorkRecord, PersistenceError> {
        self.lock()
            .works
            .iter()
            .find(|w| &w.id == id)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound(id.clone()))
    }

    async fn fetch_page(
        &self,
        user_id: Option<&str>,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<WorkRecord>, PersistenceError> {
        let skip = page.max(1).saturating_sub(1).saturating_mul(page_size);
        let inner = self.lock();
        Ok(Self::matching(&inner.works, user_id)
            .skip(skip)
            .take(page_size)
            .cloned()
            .collect())
    }

    async fn fetch_count(&self, user_id: Option<&str>) -> Result<usize, PersistenceError> {
        Ok(Self::matching(&self.lock().works, user_id).count())
    }
}
