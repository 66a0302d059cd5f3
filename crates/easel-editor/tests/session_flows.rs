//! Integration tests: full editor sessions driven through pointer events,
//! image loads, and saves.

use easel_core::{Color, ShapeKind, StyleConfig, WorkDraft};
use easel_editor::{
    CanvasHandle, DEFAULT_PAGE_SIZE, EditorSession, ImageStore, MemoryStore, Notice, NoticeQueue,
    Notifier, PersistenceError, SaveError, WorkStore,
};
use easel_render::{
    BLANK_DATA_URL, EncodeError, FetchMode, FetchedImage, ImageLoadError, ImageSource,
    data_url_bytes,
};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

const RED: Color = Color::rgb(255, 0, 0);
const BLUE: Color = Color::rgb(0, 0, 255);

#[derive(Clone, Default)]
struct Notices(Rc<RefCell<Vec<Notice>>>);

impl Notices {
    fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

impl Notifier for Notices {
    fn notify(&self, notice: Notice) {
        self.0.borrow_mut().push(notice);
    }
}

fn session_with<S: ImageStore>(
    store: S,
    style: StyleConfig,
    side: u32,
) -> (EditorSession<S>, Notices) {
    let notices = Notices::default();
    let mut session = EditorSession::new(store, style).with_notifier(notices.clone());
    assert!(session.mount(side, side));
    (session, notices)
}

/// Serves fixed bytes for every URL.
struct FixtureSource {
    result: Result<Vec<u8>, String>,
    origin_clean: bool,
}

impl ImageSource for FixtureSource {
    async fn fetch(&self, url: &str, mode: FetchMode) -> Result<FetchedImage, ImageLoadError> {
        assert_eq!(mode, FetchMode::Anonymous);
        match &self.result {
            Ok(bytes) => Ok(FetchedImage {
                bytes: bytes.clone(),
                origin_clean: self.origin_clean,
            }),
            Err(reason) => Err(ImageLoadError::Fetch {
                url: url.to_string(),
                reason: reason.clone(),
            }),
        }
    }
}

/// Image store that yields once before answering, so saves overlap.
#[derive(Default)]
struct SlowStore(MemoryStore);

impl ImageStore for SlowStore {
    async fn save(&self, encoded_image: &str) -> Result<String, PersistenceError> {
        tokio::task::yield_now().await;
        self.0.save(encoded_image).await
    }
}

/// PNG bytes of a `width`x`height` image with a thick blue band through it.
fn banded_png(width: u32, height: u32) -> Vec<u8> {
    let style = StyleConfig::default().with_color(BLUE).with_line_width(50);
    let mut painter = EditorSession::new(MemoryStore::new(), style);
    assert!(painter.mount(width, height));
    painter.pointer_down(0.0, height as f32 / 2.0);
    painter.pointer_move(width as f32, height as f32 / 2.0);
    painter.pointer_up(width as f32, height as f32 / 2.0);
    let url = painter.get_canvas_data_url().unwrap();
    data_url_bytes(&url).unwrap().1
}

// ─── Drawing ────────────────────────────────────────────────────────────

#[test]
fn freehand_segments_use_style_at_commit_time() {
    let style = StyleConfig::default().with_color(RED).with_line_width(5);
    let (mut s, _) = session_with(MemoryStore::new(), style, 100);

    assert!(!s.pointer_down(10.0, 50.0));
    let mut segments = 0;
    segments += s.pointer_move(30.0, 50.0) as usize;
    s.set_style(style.with_color(BLUE));
    segments += s.pointer_move(50.0, 50.0) as usize;
    segments += s.pointer_move(70.0, 50.0) as usize;
    s.pointer_up(70.0, 50.0);

    // Four sampled points, three segments.
    assert_eq!(segments, 3);
    assert_eq!(s.surface().pixel(20, 50), Some(RED));
    assert_eq!(s.surface().pixel(40, 50), Some(BLUE));
    assert_eq!(s.surface().pixel(60, 50), Some(BLUE));
    assert!(s.is_dirty());
}

#[test]
fn pointer_leave_keeps_partial_line() {
    let (mut s, _) = session_with(MemoryStore::new(), StyleConfig::default(), 100);
    s.pointer_down(10.0, 10.0);
    s.pointer_move(40.0, 10.0);
    s.pointer_leave(99.0, 10.0);

    assert_eq!(s.surface().pixel(25, 10), Some(Color::BLACK));
    assert!(s.is_dirty());
    // Nothing more is drawn after the gesture ended.
    assert!(!s.pointer_move(60.0, 60.0));
}

#[test]
fn each_shape_paints_in_stroke_color() {
    for kind in ShapeKind::ALL {
        let style = StyleConfig::default().with_shape(kind).with_color(RED);
        let (mut s, _) = session_with(MemoryStore::new(), style, 120);
        s.pointer_down(60.0, 60.0);
        if kind == ShapeKind::Line {
            s.pointer_move(100.0, 90.0);
        }
        s.pointer_up(100.0, 90.0);

        let rgba = s.surface().to_rgba().unwrap();
        assert!(
            rgba.chunks_exact(4).any(|px| px == [255, 0, 0, 255]),
            "{kind} left no solid red pixel"
        );
    }
}

#[test]
fn clear_then_export_is_blank() {
    let style = StyleConfig::default().with_shape(ShapeKind::Star);
    let (mut s, _) = session_with(MemoryStore::new(), style, 80);
    s.pointer_down(40.0, 40.0);
    s.pointer_up(70.0, 40.0);
    assert!(!s.surface().is_blank());

    s.clear_canvas();
    assert!(!s.is_dirty());
    let url = CanvasHandle::get_data_url(&s).unwrap();
    let decoded = easel_render::decode_data_url(&url).unwrap();
    assert!(decoded.pixels().iter().all(|p| p.alpha() == 0));
}

#[test]
fn unmounted_session_exports_blank_url() {
    let (mut s, _) = session_with(MemoryStore::new(), StyleConfig::default(), 10);
    s.unmount();
    assert_eq!(s.get_canvas_data_url().unwrap(), BLANK_DATA_URL);
    assert!(!s.pointer_down(1.0, 1.0));
}

#[test]
fn finished_gesture_is_captured_in_snapshot_slot() {
    let (mut s, _) = session_with(MemoryStore::new(), StyleConfig::default(), 60);
    let buffer = |s: &EditorSession<MemoryStore>| s.surface().pixmap().unwrap().data().to_vec();

    s.pointer_down(5.0, 5.0);
    s.pointer_move(30.0, 30.0);
    // Mid-gesture the slot still holds the state from before the stroke.
    assert_ne!(s.surface().latest_snapshot().unwrap().data(), &buffer(&s)[..]);

    s.pointer_up(30.0, 30.0);
    assert_eq!(s.surface().latest_snapshot().unwrap().data(), &buffer(&s)[..]);

    s.set_style(StyleConfig::default().with_shape(ShapeKind::Rectangle));
    s.pointer_down(10.0, 40.0);
    s.pointer_up(50.0, 55.0);
    let after_shape = buffer(&s);
    assert_eq!(s.surface().latest_snapshot().unwrap().data(), &after_shape[..]);
    assert!(!s.surface().is_blank());
}

// ─── Image loading ──────────────────────────────────────────────────────

#[tokio::test]
async fn wide_image_is_letterboxed_vertically() {
    let (mut s, notices) = session_with(MemoryStore::new(), StyleConfig::default(), 400);
    s.pointer_down(1.0, 1.0);
    s.pointer_up(1.0, 1.0);
    assert!(s.is_dirty());

    let source = FixtureSource {
        result: Ok(banded_png(200, 100)),
        origin_clean: true,
    };
    let fit = s.load_image(&source, "https://example.test/wide.png").await.unwrap().unwrap();

    assert_eq!((fit.x, fit.y, fit.width, fit.height), (0.0, 100.0, 400.0, 200.0));
    assert_eq!(s.surface().loaded_image(), Some("https://example.test/wide.png"));
    assert!(!s.is_dirty());
    assert!(notices.take().is_empty());
    // Letterbox bars stay empty.
    assert_eq!(s.surface().pixel(200, 50).map(|c| c.a), Some(0));
    assert_eq!(s.surface().pixel(200, 350).map(|c| c.a), Some(0));
}

#[tokio::test]
async fn failed_load_notifies_and_keeps_buffer() {
    let style = StyleConfig::default().with_shape(ShapeKind::Rectangle);
    let (mut s, notices) = session_with(MemoryStore::new(), style, 50);
    s.pointer_down(10.0, 10.0);
    s.pointer_up(30.0, 30.0);
    let before = s.surface().to_rgba().unwrap();

    let source = FixtureSource {
        result: Err("404".into()),
        origin_clean: true,
    };
    assert!(s.load_image(&source, "https://example.test/missing.png").await.is_err());
    assert_eq!(notices.take(), vec![Notice::ImageLoadFailed]);
    assert_eq!(s.surface().to_rgba().unwrap(), before);
    assert!(s.is_dirty());

    // Garbage bytes fail the same way.
    assert!(s.load_image_bytes(b"not an image", "x", true).is_err());
    assert_eq!(notices.take(), vec![Notice::ImageLoadFailed]);
}

#[tokio::test]
async fn load_after_unmount_is_ignored() {
    let (mut s, notices) = session_with(MemoryStore::new(), StyleConfig::default(), 50);
    s.unmount();
    let source = FixtureSource {
        result: Ok(banded_png(20, 20)),
        origin_clean: true,
    };
    assert!(s.load_image(&source, "late.png").await.unwrap().is_none());
    assert!(notices.take().is_empty());
}

#[tokio::test]
async fn tainted_buffer_refuses_to_save_until_cleared() {
    let (mut s, notices) = session_with(MemoryStore::new(), StyleConfig::default(), 40);
    let source = FixtureSource {
        result: Ok(banded_png(20, 20)),
        origin_clean: false,
    };
    s.load_image(&source, "https://elsewhere.test/a.png").await.unwrap();

    assert!(matches!(s.get_canvas_data_url(), Err(EncodeError::Tainted)));
    assert!(matches!(s.save_canvas().await, Err(SaveError::Encode(EncodeError::Tainted))));
    assert_eq!(notices.take(), vec![Notice::SaveFailed]);

    s.clear_canvas();
    assert!(s.save_canvas().await.is_ok());
}

#[test]
fn clean_reload_replaces_tainted_image() {
    let (mut s, _) = session_with(MemoryStore::new(), StyleConfig::default(), 40);
    let png = banded_png(20, 20);

    s.load_image_bytes(&png, "https://elsewhere.test/a.png", false).unwrap();
    assert!(s.surface().is_tainted());
    assert!(s.get_canvas_data_url().is_err());

    s.load_image_bytes(&png, "https://same.test/b.png", true).unwrap();
    assert!(!s.surface().is_tainted());
    assert_eq!(s.surface().loaded_image(), Some("https://same.test/b.png"));
    assert!(s.get_canvas_data_url().is_ok());
}

// ─── Saving ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn save_stores_export_and_clears_dirty() {
    let style = StyleConfig::default().with_shape(ShapeKind::Circle);
    let (mut s, notices) = session_with(MemoryStore::new(), style, 60);
    s.pointer_down(30.0, 30.0);
    s.pointer_up(45.0, 30.0);
    let exported = s.get_canvas_data_url().unwrap();

    let url = s.save_canvas().await.unwrap();
    assert_eq!(url, "memory://images/1.png");
    assert_eq!(s.store().image(&url), Some(exported));
    assert!(!s.is_dirty());
    assert_eq!(notices.take(), vec![Notice::Saved(url)]);
}

#[tokio::test]
async fn overlapping_saves_are_single_flight() {
    let (s, _) = session_with(SlowStore::default(), StyleConfig::default(), 30);

    let (first, second) = tokio::join!(s.save_canvas(), CanvasHandle::save(&s));
    assert_eq!(first.unwrap(), "memory://images/1.png");
    assert!(matches!(second, Err(SaveError::InFlight)));

    // The slot is free again once the first save settled.
    assert_eq!(s.save_canvas().await.unwrap(), "memory://images/2.png");
}

#[tokio::test]
async fn persistence_failure_is_notified_and_returned() {
    let (mut s, notices) = session_with(MemoryStore::new(), StyleConfig::default(), 30);
    s.pointer_down(5.0, 5.0);
    s.pointer_move(20.0, 20.0);
    s.pointer_up(20.0, 20.0);

    s.store().fail_next_save();
    let err = s.save_canvas().await.unwrap_err();
    assert!(matches!(err, SaveError::Persistence(PersistenceError::Unavailable(_))));
    assert_eq!(notices.take(), vec![Notice::SaveFailed]);
    assert!(s.is_dirty());

    // Still interactive; a retry goes through.
    s.pointer_down(1.0, 1.0);
    assert!(s.pointer_move(3.0, 3.0));
    s.pointer_up(3.0, 3.0);
    assert!(s.save_canvas().await.is_ok());
}

// ─── Notices ────────────────────────────────────────────────────────────

/// Host handler that calls back into the session it was notified by.
struct ReentrantHost {
    session: Rc<RefCell<EditorSession<MemoryStore>>>,
    seen: RefCell<Vec<(Notice, bool)>>,
}

impl Notifier for ReentrantHost {
    fn notify(&self, notice: Notice) {
        let reentered = self
            .session
            .try_borrow_mut()
            .map(|mut s| {
                s.clear_canvas();
                s.is_dirty()
            })
            .is_ok();
        self.seen.borrow_mut().push((notice, reentered));
    }
}

#[tokio::test]
async fn queued_notices_reach_host_after_borrow_ends() {
    let queue = NoticeQueue::new();
    let mut session =
        EditorSession::new(MemoryStore::new(), StyleConfig::default()).with_notifier(queue.clone());
    assert!(session.mount(20, 20));
    let shared = Rc::new(RefCell::new(session));
    let host = ReentrantHost {
        session: Rc::clone(&shared),
        seen: RefCell::new(Vec::new()),
    };

    assert!(shared.borrow_mut().load_image_bytes(b"garbage", "x.png", true).is_err());
    {
        let session = shared.borrow();
        let ticket = session.begin_save().unwrap();
        let result = session.store().save(ticket.encoded()).await;
        session.finish_save(ticket, result).unwrap();
    }
    assert!(host.seen.borrow().is_empty());

    queue.deliver(&host);
    assert!(queue.is_empty());
    assert_eq!(
        host.seen.into_inner(),
        vec![
            (Notice::ImageLoadFailed, true),
            (Notice::Saved("memory://images/1.png".into()), true),
        ]
    );
}

// ─── Publishing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn publish_creates_listed_work() {
    let (mut s, _) = session_with(MemoryStore::new(), StyleConfig::default(), 30);
    s.pointer_down(2.0, 2.0);
    s.pointer_move(25.0, 25.0);
    s.pointer_up(25.0, 25.0);

    let works = MemoryStore::new();
    let draft = WorkDraft {
        title: "Sketch".into(),
        description: "first try".into(),
        user_id: "ann".into(),
    };
    let record = s.publish(&works, draft).await.unwrap();
    assert_eq!(record.image_url, "memory://images/1.png");
    assert!(s.store().image(&record.image_url).is_some());

    let page = works.fetch_page(Some("ann"), 1, DEFAULT_PAGE_SIZE).await.unwrap();
    assert_eq!(page, vec![record.clone()]);
    assert_eq!(works.fetch_count(Some("bob")).await.unwrap(), 0);
}

#[tokio::test]
async fn publish_skips_record_when_save_fails() {
    let (s, notices) = session_with(MemoryStore::new(), StyleConfig::default(), 30);
    s.store().fail_next_save();
    let works = MemoryStore::new();

    assert!(s.publish(&works, WorkDraft::default()).await.is_err());
    assert_eq!(works.fetch_count(None).await.unwrap(), 0);
    assert_eq!(notices.take(), vec![Notice::SaveFailed]);
}
