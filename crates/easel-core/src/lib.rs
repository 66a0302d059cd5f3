pub mod config;
pub mod model;
pub mod shapes;
pub mod work;

pub use config::{ConfigError, StyleChange, StyleConfig, canvas_side_for_viewport};
pub use model::*;
pub use shapes::{ShapeParams, circle_radius, segment_path, shape_path};
pub use work::{Timestamp, WorkDraft, WorkId, WorkPatch, WorkRecord};

// Re-export kurbo geometry so downstream crates don't need a direct dependency
pub use kurbo::{BezPath, PathEl};
