//! Single-slot pixel snapshots.
//!
//! A snapshot is a full copy of the buffer. Only the most recent one is
//! kept; capturing again overwrites it in place when the size matches.

use tiny_skia::Pixmap;

/// An opaque point-in-time copy of the buffer.
#[derive(Clone)]
pub struct Snapshot {
    pixels: Pixmap,
}

impl Snapshot {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Raw premultiplied RGBA bytes.
    pub fn data(&self) -> &[u8] {
        self.pixels.data()
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Snapshot({}x{})", self.width(), self.height())
    }
}

#[derive(Debug, Default)]
pub struct SnapshotStore {
    slot: Option<Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `pixmap` into the slot, replacing whatever was there.
    pub fn capture(&mut self, pixmap: &Pixmap) -> &Snapshot {
        let same_size = self
            .slot
            .as_ref()
            .is_some_and(|s| s.width() == pixmap.width() && s.height() == pixmap.height());
        if !same_size {
            return self.slot.insert(snapshot_of(pixmap));
        }
        let snapshot = self.slot.get_or_insert_with(|| snapshot_of(pixmap));
        snapshot.pixels.data_mut().copy_from_slice(pixmap.data());
        snapshot
    }

    /// Write the slot back into `pixmap` at the origin.
    /// Returns `false` when the slot is empty or the sizes differ.
    pub fn restore(&self, pixmap: &mut Pixmap) -> bool {
        match &self.slot {
            Some(snapshot) => restore_into(snapshot, pixmap),
            None => false,
        }
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.slot.as_ref()
    }

    pub fn discard(&mut self) {
        self.slot = None;
    }
}

/// Overwrite `pixmap` with `snapshot`. Sizes must match.
pub(crate) fn restore_into(snapshot: &Snapshot, pixmap: &mut Pixmap) -> bool {
    if snapshot.width() != pixmap.width() || snapshot.height() != pixmap.height() {
        log::warn!(
            "snapshot {}x{} does not match buffer {}x{}",
            snapshot.width(),
            snapshot.height(),
            pixmap.width(),
            pixmap.height()
        );
        return false;
    }
    pixmap.data_mut().copy_from_slice(snapshot.pixels.data());
    true
}

pub(crate) fn snapshot_of(pixmap: &Pixmap) -> Snapshot {
    Snapshot {
        pixels: pixmap.clone(),
    }
}
