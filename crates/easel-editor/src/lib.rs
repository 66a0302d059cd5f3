pub mod input;
pub mod pointer;
pub mod session;
pub mod store;

pub use input::InputEvent;
pub use pointer::{DrawCommand, DrawCommands, PointerInputController, PointerState};
pub use session::{
    CanvasHandle, EditorSession, LogNotifier, Notice, NoticeQueue, Notifier, SaveError, SaveTicket,
};
pub use store::{DEFAULT_PAGE_SIZE, ImageStore, MemoryStore, PersistenceError, WorkStore};
