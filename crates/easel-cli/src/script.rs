//! Replay scripts: a viewport, an initial style, and a list of steps.
//!
//! ```json
//! {
//!   "viewport_height": 500,
//!   "style": "shape=line&color=%23ff0000&brushSize=3",
//!   "background": "photo.png",
//!   "steps": [
//!     { "op": "down", "x": 10, "y": 10 },
//!     { "op": "move", "x": 40, "y": 12 },
//!     { "op": "up", "x": 40, "y": 12 },
//!     { "op": "style", "query": "shape=circle" },
//!     { "op": "clear" }
//!   ]
//! }
//! ```

use easel_editor::InputEvent;
use serde::Deserialize;

fn default_viewport_height() -> f64 {
    500.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Script {
    #[serde(default = "default_viewport_height")]
    pub viewport_height: f64,
    /// Initial style query. Empty means defaults.
    #[serde(default)]
    pub style: String,
    /// Image composited before the steps run, relative to the script.
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up { x: f32, y: f32 },
    Leave { x: f32, y: f32 },
    Style { query: String },
    Clear,
}

impl Step {
    /// The pointer event for pointer steps.
    pub fn as_event(&self) -> Option<InputEvent> {
        match *self {
            Step::Down { x, y } => Some(InputEvent::from_pointer_down(x, y)),
            Step::Move { x, y } => Some(InputEvent::from_pointer_move(x, y)),
            Step::Up { x, y } => Some(InputEvent::from_pointer_up(x, y)),
            Step::Leave { x, y } => Some(InputEvent::from_pointer_leave(x, y)),
            Step::Style { .. } | Step::Clear => None,
        }
    }
}
