//! Editor session: one drawing surface, its input, style, and persistence.
//!
//! The session owns the [`RasterSurface`] and applies the commands the
//! pointer controller produces. It tracks whether the buffer holds unsaved
//! edits and talks to the host through two capabilities: an [`ImageStore`]
//! for saving and a [`Notifier`] for user-visible notices.
//!
//! Saving is single-flight. A save that starts while another is pending
//! fails with [`SaveError::InFlight`] instead of racing it.

use crate::input::InputEvent;
use crate::pointer::{DrawCommand, PointerInputController};
use crate::store::{ImageStore, PersistenceError, WorkStore};
use easel_core::{
    ConfigError, ShapeParams, StyleChange, StyleConfig, WorkDraft, WorkRecord,
    canvas_side_for_viewport, segment_path, shape_path,
};
use easel_render::{
    DecodedImage, EncodeError, FitRect, ImageLoadError, ImageSource, RasterSurface, composite,
    load_into,
};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

// ─── Notifications ───────────────────────────────────────────────────────

/// Transient, user-visible outcome of a load or save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    ImageLoadFailed,
    SaveFailed,
    /// The canvas was stored under this reference.
    Saved(String),
}

impl Notice {
    pub fn is_error(&self) -> bool {
        !matches!(self, Notice::Saved(_))
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::ImageLoadFailed => f.write_str("Failed to load image"),
            Notice::SaveFailed => f.write_str("Failed to save canvas image"),
            Notice::Saved(url) => write!(f, "Saved canvas image to {url}"),
        }
    }
}

/// Host hook for toasts and similar.
pub trait Notifier {
    fn notify(&self, notice: Notice);
}

/// Default notifier: writes notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        if notice.is_error() {
            log::error!("{notice}");
        } else {
            log::info!("{notice}");
        }
    }
}

/// Holds notices until [`deliver`](Self::deliver) is called.
///
/// Hosts that keep the session behind a `RefCell` install a clone as the
/// session's notifier and deliver once their borrow is released, so a
/// callback that re-enters the session never sees it borrowed.
#[derive(Debug, Clone, Default)]
pub struct NoticeQueue(Rc<RefCell<VecDeque<Notice>>>);

impl NoticeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Take every pending notice, oldest first.
    pub fn drain(&self) -> Vec<Notice> {
        self.0.borrow_mut().drain(..).collect()
    }

    /// Hand pending notices to `sink`.
    pub fn deliver(&self, sink: &dyn Notifier) {
        for notice in self.drain() {
            sink.notify(notice);
        }
    }
}

impl Notifier for NoticeQueue {
    fn notify(&self, notice: Notice) {
        self.0.borrow_mut().push_back(notice);
    }
}

// ─── Saving ──────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("a save is already in progress")]
    InFlight,
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Releases the single-flight flag when dropped.
#[derive(Debug)]
struct InFlightGuard(Rc<Cell<bool>>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// An export taken at the start of a save.
///
/// Hand the ticket back to [`EditorSession::finish_save`] with the store's
/// answer. Dropping it without finishing abandons the save and frees the
/// slot for the next one.
#[derive(Debug)]
pub struct SaveTicket {
    encoded: String,
    revision: u64,
    _guard: InFlightGuard,
}

impl SaveTicket {
    /// The data URL to hand to the store.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }
}

/// What the hosting page holds to drive the canvas from outside, e.g. when
/// a form submission needs the image.
#[allow(async_fn_in_trait)]
pub trait CanvasHandle {
    fn get_data_url(&self) -> Result<String, EncodeError>;
    async fn save(&self) -> Result<String, SaveError>;
    fn clear(&mut self);
}

// ─── Session ─────────────────────────────────────────────────────────────

pub struct EditorSession<S> {
    surface: RasterSurface,
    pointer: PointerInputController,
    style: StyleConfig,
    params: ShapeParams,
    store: S,
    notifier: Box<dyn Notifier>,
    dirty: Cell<bool>,
    /// Bumped on every buffer mutation; lets a save tell whether it is stale.
    revision: Cell<u64>,
    save_in_flight: Rc<Cell<bool>>,
}

impl<S> fmt::Debug for EditorSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorSession")
            .field("surface", &self.surface)
            .field("pointer", &self.pointer)
            .field("style", &self.style)
            .field("dirty", &self.dirty.get())
            .field("revision", &self.revision.get())
            .field("save_in_flight", &self.save_in_flight.get())
            .finish_non_exhaustive()
    }
}

impl<S: ImageStore> EditorSession<S> {
    pub fn new(store: S, style: StyleConfig) -> Self {
        Self {
            surface: RasterSurface::new(),
            pointer: PointerInputController::new(),
            style: style.with_line_width(style.line_width),
            params: ShapeParams::default(),
            store,
            notifier: Box::new(LogNotifier),
            dirty: Cell::new(false),
            revision: Cell::new(0),
            save_in_flight: Rc::new(Cell::new(false)),
        }
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn with_shape_params(mut self, params: ShapeParams) -> Self {
        self.params = params;
        self
    }

    // ── Lifecycle ──

    /// Allocate the buffer and apply the configured style.
    /// Returns `false` if already mounted or the size is empty.
    pub fn mount(&mut self, width: u32, height: u32) -> bool {
        if !self.surface.initialize(width, height) {
            return false;
        }
        let stroke = self.style.stroke_style();
        self.surface.apply_style(stroke.color, stroke.width);
        self.dirty.set(false);
        log::info!("canvas mounted at {width}x{height}");
        true
    }

    /// Mount a square canvas sized for a viewport of the given height.
    pub fn mount_for_viewport(&mut self, viewport_height: f64) -> bool {
        let side = canvas_side_for_viewport(viewport_height);
        self.mount(side, side)
    }

    /// Tear the surface down. Pending loads and saves complete as no-ops.
    pub fn unmount(&mut self) {
        self.pointer.reset();
        self.surface.teardown();
    }

    pub fn is_mounted(&self) -> bool {
        self.surface.is_initialized()
    }

    // ── Style ──

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub fn shape_params(&self) -> &ShapeParams {
        &self.params
    }

    /// Switch to `next`. Only a stroke change touches the paint context;
    /// existing pixels never change.
    pub fn set_style(&mut self, next: StyleConfig) -> StyleChange {
        let next = next.with_line_width(next.line_width);
        let change = self.style.diff(&next);
        self.style = next;
        if change.stroke {
            let stroke = next.stroke_style();
            self.surface.apply_style(stroke.color, stroke.width);
        }
        if !change.is_empty() {
            log::debug!("style now {}", next.to_query());
        }
        change
    }

    /// [`set_style`](Self::set_style) from a `shape=..&color=..&brushSize=..`
    /// query. On error the current style is kept.
    pub fn set_style_query(&mut self, query: &str) -> Result<StyleChange, ConfigError> {
        let next = StyleConfig::from_query(query)?;
        Ok(self.set_style(next))
    }

    // ── Input ──

    /// Feed a pointer event. Returns `true` if the buffer changed.
    pub fn handle_event(&mut self, event: &InputEvent) -> bool {
        if !self.surface.is_initialized() {
            return false;
        }
        let commands = self.pointer.handle(event, self.style.shape);
        let mut painted = false;
        for command in commands {
            painted |= self.apply(command);
        }
        painted
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) -> bool {
        self.handle_event(&InputEvent::from_pointer_down(x, y))
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) -> bool {
        self.handle_event(&InputEvent::from_pointer_move(x, y))
    }

    pub fn pointer_up(&mut self, x: f32, y: f32) -> bool {
        self.handle_event(&InputEvent::from_pointer_up(x, y))
    }

    pub fn pointer_leave(&mut self, x: f32, y: f32) -> bool {
        self.handle_event(&InputEvent::from_pointer_leave(x, y))
    }

    fn apply(&mut self, command: DrawCommand) -> bool {
        match command {
            DrawCommand::BeginPath { .. } => false,
            DrawCommand::Segment { from, to } => self.paint(&segment_path(from, to)),
            DrawCommand::Shape { kind, start, end } => {
                match shape_path(kind, start, end, &self.params) {
                    Some(path) => self.paint(&path),
                    None => false,
                }
            }
            DrawCommand::EndGesture => {
                self.surface.commit();
                self.dirty.set(true);
                false
            }
        }
    }

    fn paint(&mut self, path: &easel_core::BezPath) -> bool {
        let painted = self.surface.stroke(path);
        if painted {
            self.bump_revision();
        }
        painted
    }

    fn bump_revision(&self) {
        self.revision.set(self.revision.get().wrapping_add(1));
    }

    // ── Buffer operations ──

    /// Unsaved edits since the last clear, load, or save.
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn get_canvas_data_url(&self) -> Result<String, EncodeError> {
        self.surface.export_encoded()
    }

    pub fn clear_canvas(&mut self) {
        self.pointer.reset();
        self.surface.clear();
        self.dirty.set(false);
        self.bump_revision();
    }

    /// Fetch `url` from `source` and letterbox it into the cleared buffer.
    ///
    /// Failures notify the host and leave the buffer as it was. If the
    /// session was unmounted meanwhile, the result is `Ok(None)`.
    pub async fn load_image<I: ImageSource>(
        &mut self,
        source: &I,
        url: &str,
    ) -> Result<Option<FitRect>, ImageLoadError> {
        match load_into(&mut self.surface, source, url).await {
            Ok(fit) => {
                if fit.is_some() {
                    self.after_load();
                }
                Ok(fit)
            }
            Err(err) => {
                log::warn!("loading '{url}' failed: {err}");
                self.notifier.notify(Notice::ImageLoadFailed);
                Err(err)
            }
        }
    }

    /// Decode bytes the host already fetched and composite them.
    pub fn load_image_bytes(
        &mut self,
        bytes: &[u8],
        url: &str,
        origin_clean: bool,
    ) -> Result<Option<FitRect>, ImageLoadError> {
        match DecodedImage::decode(bytes, origin_clean) {
            Ok(image) => Ok(self.composite_image(&image, url)),
            Err(err) => {
                log::warn!("decoding '{url}' failed: {err}");
                self.notifier.notify(Notice::ImageLoadFailed);
                Err(err)
            }
        }
    }

    /// Composite an already decoded image. `None` when unmounted.
    pub fn composite_image(&mut self, image: &DecodedImage, url: &str) -> Option<FitRect> {
        let fit = composite(&mut self.surface, image, url)?;
        self.after_load();
        Some(fit)
    }

    fn after_load(&mut self) {
        self.pointer.reset();
        self.dirty.set(false);
        self.bump_revision();
    }

    // ── Saving ──

    /// Export the buffer and claim the save slot.
    pub fn begin_save(&self) -> Result<SaveTicket, SaveError> {
        if self.save_in_flight.get() {
            log::warn!("save requested while another is pending");
            return Err(SaveError::InFlight);
        }
        let encoded = self.surface.export_encoded().map_err(|err| {
            log::error!("export failed: {err}");
            self.notifier.notify(Notice::SaveFailed);
            SaveError::from(err)
        })?;
        self.save_in_flight.set(true);
        Ok(SaveTicket {
            encoded,
            revision: self.revision.get(),
            _guard: InFlightGuard(Rc::clone(&self.save_in_flight)),
        })
    }

    /// Settle a save with the store's answer.
    ///
    /// The dirty flag is cleared only if nothing was drawn while the save
    /// was pending. Failures notify the host and are returned to the caller.
    pub fn finish_save(
        &self,
        ticket: SaveTicket,
        result: Result<String, PersistenceError>,
    ) -> Result<String, SaveError> {
        let revision = ticket.revision;
        drop(ticket);
        match result {
            Ok(url) => {
                if self.revision.get() == revision {
                    self.dirty.set(false);
                }
                self.notifier.notify(Notice::Saved(url.clone()));
                Ok(url)
            }
            Err(err) => {
                log::error!("save failed: {err}");
                self.notifier.notify(Notice::SaveFailed);
                Err(err.into())
            }
        }
    }

    /// Export and store the canvas. Returns the stored image's reference.
    pub async fn save_canvas(&self) -> Result<String, SaveError> {
        let ticket = self.begin_save()?;
        let result = self.store.save(ticket.encoded()).await;
        self.finish_save(ticket, result)
    }

    /// Save the canvas, then record it as a work in `works`.
    pub async fn publish<W: WorkStore>(
        &self,
        works: &W,
        draft: WorkDraft,
    ) -> Result<WorkRecord, SaveError> {
        let url = self.save_canvas().await?;
        works.create(draft, url).await.map_err(|err| {
            log::error!("creating work failed: {err}");
            self.notifier.notify(Notice::SaveFailed);
            SaveError::from(err)
        })
    }

    // ── Accessors ──

    /// Forward a notice to the host, e.g. for failures the host hit itself.
    pub fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }

    pub fn surface(&self) -> &RasterSurface {
        &self.surface
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: ImageStore> CanvasHandle for EditorSession<S> {
    fn get_data_url(&self) -> Result<String, EncodeError> {
        self.get_canvas_data_url()
    }

    async fn save(&self) -> Result<String, SaveError> {
        self.save_canvas().await
    }

    fn clear(&mut self) {
        self.clear_canvas();
    }
}
