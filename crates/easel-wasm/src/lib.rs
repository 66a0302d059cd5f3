//! WASM bridge for Easel: exposes the drawing session to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. The page forwards pointer
//! events, calls `present` after each change, and drives saving through the
//! returned promises.

mod host;

pub use host::{BrowserSource, JsImageStore, JsNotifier};

use easel_core::StyleConfig;
use easel_editor::{EditorSession, LogNotifier, Notice, NoticeQueue};
use easel_render::{FetchMode, ImageSource};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::Clamped;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, ImageData};

type Session = EditorSession<JsImageStore>;

/// Where queued notices end up: the page's callback, or the log.
#[derive(Clone)]
enum NoticeSink {
    Host(JsNotifier),
    Log,
}

impl NoticeSink {
    /// Deliver everything `queue` holds. Call only with no session borrow live.
    fn flush(&self, queue: &NoticeQueue) {
        match self {
            NoticeSink::Host(host) => queue.deliver(host),
            NoticeSink::Log => queue.deliver(&LogNotifier),
        }
    }
}

/// The WASM-facing canvas controller.
///
/// Async work (loads, saves) holds only a weak reference to the session,
/// so completions after `unmount` or after the page dropped the canvas are
/// ignored. Notices are queued by the session and handed to the page after
/// the session borrow ends, so the page may call back into the canvas from
/// its notice handler.
#[wasm_bindgen]
pub struct EaselCanvas {
    session: Rc<RefCell<Session>>,
    notices: NoticeQueue,
    sink: NoticeSink,
}

#[wasm_bindgen]
impl EaselCanvas {
    /// Mount a square canvas sized for `viewport_height`.
    ///
    /// `query` carries the initial style (`shape`, `color`, `brushSize`).
    /// `persist` stores a data URL and returns its reference URL, possibly
    /// through a promise. `on_notice(message, isError)` receives toasts.
    #[wasm_bindgen(constructor)]
    pub fn new(
        viewport_height: f64,
        query: &str,
        persist: js_sys::Function,
        on_notice: Option<js_sys::Function>,
    ) -> Result<EaselCanvas, JsValue> {
        console_error_panic_hook_setup();

        let style = StyleConfig::from_query(query).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let notices = NoticeQueue::new();
        let mut session =
            EditorSession::new(JsImageStore::new(persist), style).with_notifier(notices.clone());
        if !session.mount_for_viewport(viewport_height) {
            return Err(JsValue::from_str("viewport too small for a canvas"));
        }
        let sink = on_notice.map_or(NoticeSink::Log, |cb| NoticeSink::Host(JsNotifier::new(cb)));
        Ok(Self {
            session: Rc::new(RefCell::new(session)),
            notices,
            sink,
        })
    }

    /// Side length of the buffer in pixels; 0 once unmounted.
    pub fn side(&self) -> u32 {
        self.session.borrow().surface().size().map_or(0, |(w, _)| w)
    }

    // ── Pointer events ──

    pub fn pointer_down(&self, x: f32, y: f32) -> bool {
        self.session.borrow_mut().pointer_down(x, y)
    }

    pub fn pointer_move(&self, x: f32, y: f32) -> bool {
        self.session.borrow_mut().pointer_move(x, y)
    }

    pub fn pointer_up(&self, x: f32, y: f32) -> bool {
        self.session.borrow_mut().pointer_up(x, y)
    }

    pub fn pointer_leave(&self, x: f32, y: f32) -> bool {
        self.session.borrow_mut().pointer_leave(x, y)
    }

    // ── Style ──

    /// Apply a style query. Returns `false` and keeps the old style if the
    /// query is invalid.
    pub fn set_style(&self, query: &str) -> bool {
        match self.session.borrow_mut().set_style_query(query) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("ignoring style '{query}': {e}");
                false
            }
        }
    }

    /// Current style as a query string.
    pub fn style_query(&self) -> String {
        self.session.borrow().style().to_query()
    }

    // ── Buffer ──

    /// PNG data URL of the buffer. Throws if the buffer is tainted.
    pub fn get_data_url(&self) -> Result<String, JsValue> {
        self.session
            .borrow()
            .get_canvas_data_url()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn clear(&self) {
        self.session.borrow_mut().clear_canvas();
    }

    pub fn is_dirty(&self) -> bool {
        self.session.borrow().is_dirty()
    }

    /// Copy the buffer into a 2D context at the origin.
    pub fn present(&self, ctx: &CanvasRenderingContext2d) -> Result<(), JsValue> {
        let session = self.session.borrow();
        let surface = session.surface();
        let (Some((width, _)), Some(rgba)) = (surface.size(), surface.to_rgba()) else {
            return Ok(());
        };
        let image = ImageData::new_with_u8_clamped_array(Clamped(rgba.as_slice()), width)?;
        ctx.put_image_data(&image, 0.0, 0.0)
    }

    // ── Images ──

    /// Composite image bytes the page already fetched in CORS mode.
    /// Returns `false` (after a notice) if they do not decode.
    pub fn load_image(&self, bytes: &[u8], url: &str) -> bool {
        let loaded = self
            .session
            .borrow_mut()
            .load_image_bytes(bytes, url, true)
            .is_ok();
        self.sink.flush(&self.notices);
        loaded
    }

    /// Fetch `url` anonymously and composite it. Resolves to `true` once
    /// drawn, `false` if the canvas went away first; rejects on failure.
    pub fn load_image_url(&self, url: String) -> js_sys::Promise {
        let weak = Rc::downgrade(&self.session);
        let (notices, sink) = (self.notices.clone(), self.sink.clone());
        wasm_bindgen_futures::future_to_promise(async move {
            let fetched = BrowserSource.fetch(&url, FetchMode::Anonymous).await;
            let Some(session) = live(&weak) else {
                return Ok(JsValue::FALSE);
            };
            let loaded = {
                let mut session = session.borrow_mut();
                match fetched {
                    Ok(image) => session.load_image_bytes(&image.bytes, &url, image.origin_clean),
                    Err(e) => {
                        log::warn!("loading '{url}' failed: {e}");
                        session.notify(Notice::ImageLoadFailed);
                        Err(e)
                    }
                }
            };
            sink.flush(&notices);
            loaded
                .map(|fit| JsValue::from_bool(fit.is_some()))
                .map_err(|e| JsValue::from_str(&e.to_string()))
        })
    }

    // ── Saving ──

    /// Export and persist the buffer. Resolves to the reference URL.
    ///
    /// Rejects if another save is pending, if the buffer cannot be
    /// exported, or if the persist callback fails.
    pub fn save(&self) -> js_sys::Promise {
        let started = {
            let session = self.session.borrow();
            session
                .begin_save()
                .map(|ticket| (ticket, session.store().clone()))
        };
        self.sink.flush(&self.notices);
        let (ticket, store) = match started {
            Ok(started) => started,
            Err(e) => return js_sys::Promise::reject(&JsValue::from_str(&e.to_string())),
        };

        let weak = Rc::downgrade(&self.session);
        let (notices, sink) = (self.notices.clone(), self.sink.clone());
        wasm_bindgen_futures::future_to_promise(async move {
            use easel_editor::ImageStore;

            let result = store.save(ticket.encoded()).await;
            let Some(session) = weak.upgrade() else {
                return result
                    .map(JsValue::from)
                    .map_err(|e| JsValue::from_str(&e.to_string()));
            };
            let settled = session.borrow().finish_save(ticket, result);
            sink.flush(&notices);
            settled
                .map(JsValue::from)
                .map_err(|e| JsValue::from_str(&e.to_string()))
        })
    }

    /// Tear the buffer down. Later events and completions are no-ops.
    pub fn unmount(&self) {
        self.session.borrow_mut().unmount();
    }
}

/// The session, if the canvas still exists and is mounted.
fn live(weak: &Weak<RefCell<Session>>) -> Option<Rc<RefCell<Session>>> {
    weak.upgrade().filter(|s| s.borrow().is_mounted())
}

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Easel WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}
