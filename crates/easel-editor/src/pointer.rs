//! Pointer input controller: events → draw commands.
//!
//! One gesture at a time, no multi-touch:
//!
//! ```text
//! Idle ──down──▶ Active(kind) ──up / leave──▶ Idle
//!                  │  ▲
//!                  └──┘ move (line only: emit a segment)
//! ```
//!
//! Only freehand lines paint while the pointer moves. Every other kind is
//! committed once, on release, from the gesture's start and end points.
//! Leaving the surface mid-line keeps the segments already emitted.
//!
//! The controller never touches pixels. It returns [`DrawCommand`]s that the
//! session applies to the raster surface with the style current at that
//! moment.

use crate::input::InputEvent;
use easel_core::{Point, ShapeKind};
use smallvec::{SmallVec, smallvec};

/// Commands produced by one event; at most two per event.
pub type DrawCommands = SmallVec<[DrawCommand; 2]>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    /// A gesture started at `at`. Paints nothing.
    BeginPath { at: Point },
    /// Freehand segment.
    Segment { from: Point, to: Point },
    /// Completed shape outline.
    Shape { kind: ShapeKind, start: Point, end: Point },
    /// The gesture is over; the buffer now holds edits.
    EndGesture,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PointerState {
    #[default]
    Idle,
    Active {
        kind: ShapeKind,
        start: Point,
        /// Last sampled position, the origin of the next freehand segment.
        last: Point,
    },
}

#[derive(Debug, Default)]
pub struct PointerInputController {
    state: PointerState,
}

impl PointerInputController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PointerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, PointerState::Active { .. })
    }

    /// Drop any active gesture without emitting commands.
    pub fn reset(&mut self) {
        self.state = PointerState::Idle;
    }

    /// Feed one event. `shape` is the kind to start if this is a press.
    pub fn handle(&mut self, event: &InputEvent, shape: ShapeKind) -> DrawCommands {
        let point = event.position();
        match (*event, self.state) {
            (InputEvent::PointerDown { .. }, _) => {
                // A press while active (missed release) restarts the gesture.
                self.state = PointerState::Active {
                    kind: shape,
                    start: point,
                    last: point,
                };
                log::trace!("{shape} gesture started at ({}, {})", point.x, point.y);
                smallvec![DrawCommand::BeginPath { at: point }]
            }
            (InputEvent::PointerMove { .. }, PointerState::Active { kind, start, last }) => {
                if !kind.is_progressive() {
                    return DrawCommands::new();
                }
                self.state = PointerState::Active {
                    kind,
                    start,
                    last: point,
                };
                smallvec![DrawCommand::Segment { from: last, to: point }]
            }
            (
                InputEvent::PointerUp { .. } | InputEvent::PointerLeave { .. },
                PointerState::Active { kind, start, .. },
            ) => {
                self.state = PointerState::Idle;
                log::trace!("{kind} gesture finished at ({}, {})", point.x, point.y);
                if kind.is_progressive() {
                    smallvec![DrawCommand::EndGesture]
                } else {
                    smallvec![
                        DrawCommand::Shape {
                            kind,
                            start,
                            end: point,
                        },
                        DrawCommand::EndGesture
                    ]
                }
            }
            // Move or release with no gesture in progress.
            (_, PointerState::Idle) => DrawCommands::new(),
        }
    }
}
