//! The raster surface: pixel buffer plus paint context.
//!
//! A `RasterSurface` starts out unmounted. `initialize` allocates the buffer
//! exactly once; until then every drawing call is a silent no-op. The paint
//! context (color, width, cap) is read at the moment each stroke is
//! committed, so a style change mid-gesture affects only later strokes.
//!
//! Style changes go through a capture → reconfigure → restore cycle using
//! the single snapshot slot, which keeps existing pixels intact.

use crate::error::EncodeError;
use crate::export::{BLANK_DATA_URL, encode_data_url};
use crate::snapshot::{Snapshot, SnapshotStore, restore_into, snapshot_of};
use easel_core::{BezPath, Color, LineCap, PathEl, StrokeStyle};
use tiny_skia::{LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

#[derive(Debug, Default)]
pub struct RasterSurface {
    pixmap: Option<Pixmap>,
    style: StrokeStyle,
    snapshots: SnapshotStore,
    /// URL of the image the buffer was seeded from, if any.
    loaded_image: Option<String>,
    /// Set when opaque cross-origin pixels were composited in.
    tainted: bool,
}

impl RasterSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a `width` × `height` buffer and reset the paint context.
    ///
    /// Returns `false` without doing anything when the surface is already
    /// initialized or when there is nothing to mount (zero size).
    pub fn initialize(&mut self, width: u32, height: u32) -> bool {
        if self.pixmap.is_some() {
            log::debug!("surface already initialized, ignoring {width}x{height}");
            return false;
        }
        let Some(pixmap) = Pixmap::new(width, height) else {
            log::debug!("no mount target for {width}x{height} surface");
            return false;
        };
        log::debug!("surface initialized at {width}x{height}");
        self.pixmap = Some(pixmap);
        self.style = StrokeStyle::default();
        self.tainted = false;
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.pixmap.is_some()
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.pixmap.as_ref().map(|p| (p.width(), p.height()))
    }

    /// The paint context the next stroke will use.
    pub fn style(&self) -> StrokeStyle {
        self.style
    }

    /// Reconfigure the paint context without disturbing the buffer.
    ///
    /// Non-positive or non-finite widths are ignored, like an invalid
    /// `lineWidth` assignment on a 2D context.
    pub fn apply_style(&mut self, color: Color, line_width: f32) {
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        self.snapshots.capture(pixmap);

        self.style.color = color;
        if line_width.is_finite() && line_width > 0.0 {
            self.style.width = line_width;
        }
        self.style.cap = LineCap::Round;

        self.snapshots.restore(pixmap);
        log::trace!("style applied: {} @ {}px", color, self.style.width);
    }

    /// Stroke `path` with the current paint context.
    /// Returns `true` when something was painted.
    pub fn stroke(&mut self, path: &BezPath) -> bool {
        let Some(pixmap) = self.pixmap.as_mut() else {
            return false;
        };
        let Some(skia_path) = to_skia_path(path) else {
            return false;
        };

        let mut paint = Paint::default();
        let c = self.style.color;
        paint.set_color_rgba8(c.r, c.g, c.b, c.a);
        paint.anti_alias = true;

        let stroke = Stroke {
            width: self.style.width,
            line_cap: map_cap(self.style.cap),
            line_join: LineJoin::Miter,
            ..Default::default()
        };
        pixmap.stroke_path(&skia_path, &paint, &stroke, Transform::identity(), None);
        true
    }

    /// Record the committed state in the snapshot slot.
    pub fn commit(&mut self) {
        if let Some(pixmap) = &self.pixmap {
            self.snapshots.capture(pixmap);
        }
    }

    /// Wipe the buffer and forget the loaded image and snapshot.
    pub fn clear(&mut self) {
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill(tiny_skia::Color::TRANSPARENT);
        }
        self.loaded_image = None;
        self.snapshots.discard();
        self.tainted = false;
    }

    /// Release the buffer. Later drawing calls are no-ops until re-initialized.
    pub fn teardown(&mut self) {
        if self.pixmap.take().is_some() {
            log::debug!("surface torn down");
        }
        self.snapshots.discard();
        self.loaded_image = None;
        self.tainted = false;
    }

    /// Encode the buffer as it is right now into a PNG data URL.
    ///
    /// An unmounted surface yields [`BLANK_DATA_URL`]. A tainted buffer is an
    /// error, never a blank image.
    pub fn export_encoded(&self) -> Result<String, EncodeError> {
        let Some(pixmap) = &self.pixmap else {
            return Ok(BLANK_DATA_URL.to_string());
        };
        if self.tainted {
            return Err(EncodeError::Tainted);
        }
        encode_data_url(pixmap)
    }

    pub fn capture_snapshot(&self) -> Option<Snapshot> {
        self.pixmap.as_ref().map(snapshot_of)
    }

    pub fn restore_snapshot(&mut self, snapshot: &Snapshot) -> bool {
        match self.pixmap.as_mut() {
            Some(pixmap) => restore_into(snapshot, pixmap),
            None => false,
        }
    }

    /// The most recent snapshot in the single slot.
    pub fn latest_snapshot(&self) -> Option<&Snapshot> {
        self.snapshots.latest()
    }

    pub fn loaded_image(&self) -> Option<&str> {
        self.loaded_image.as_deref()
    }

    pub fn is_tainted(&self) -> bool {
        self.tainted
    }

    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    /// Straight-alpha color of one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let p = self.pixmap.as_ref()?.pixel(x, y)?.demultiply();
        Some(Color::rgba(p.red(), p.green(), p.blue(), p.alpha()))
    }

    /// `true` when every pixel is fully transparent (or there is no buffer).
    pub fn is_blank(&self) -> bool {
        self.pixmap
            .as_ref()
            .is_none_or(|p| p.pixels().iter().all(|px| px.alpha() == 0))
    }

    /// Straight-alpha RGBA bytes, row-major, for blitting into a host canvas.
    pub fn to_rgba(&self) -> Option<Vec<u8>> {
        let pixmap = self.pixmap.as_ref()?;
        let mut out = Vec::with_capacity(pixmap.data().len());
        for px in pixmap.pixels() {
            let c = px.demultiply();
            out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        Some(out)
    }

    pub(crate) fn pixmap_mut(&mut self) -> Option<&mut Pixmap> {
        self.pixmap.as_mut()
    }

    /// Record the image the buffer was just repainted from. The buffer was
    /// wiped first, so taint follows the new image alone.
    pub(crate) fn set_loaded_image(&mut self, url: &str, origin_clean: bool) {
        self.loaded_image = Some(url.to_string());
        self.tainted = !origin_clean;
        if self.tainted {
            log::warn!("'{url}' is cross-origin without CORS; buffer is now tainted");
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn map_cap(cap: LineCap) -> tiny_skia::LineCap {
    match cap {
        LineCap::Butt => tiny_skia::LineCap::Butt,
        LineCap::Round => tiny_skia::LineCap::Round,
        LineCap::Square => tiny_skia::LineCap::Square,
    }
}

fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => pb.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(c1, c2, p) => pb.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}
