//! Shape rasterizer: gesture endpoints → stroke paths.
//!
//! Every function here is pure. A gesture is described by the point where
//! the pointer went down (`start`) and the point where it was released
//! (`end`); the result is a `kurbo::BezPath` that the raster surface strokes
//! with whatever style is current at commit time. Shapes are outlines only.
//!
//! | Kind | Center | Size |
//! |------|--------|------|
//! | Circle | `start` | radius = `|end - start|` |
//! | Polygon | `start` | circumradius = `|end - start|`, first vertex at angle 0 |
//! | Star | `start` | outer = `|end - start|`, inner = outer / ratio, top spike first |
//! | Rectangle | - | corners at `start` and `end`, normalized |

use crate::model::{Point, ShapeKind};
use kurbo::{BezPath, Circle, Rect, Shape};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::f64::consts::{PI, TAU};

/// Flattening tolerance used when converting curves to paths.
const CURVE_TOLERANCE: f64 = 0.1;

/// Shape-specific tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeParams {
    pub polygon_sides: u32,
    pub star_spikes: u32,
    /// Outer radius divided by inner radius.
    pub star_inner_ratio: f64,
}

impl Default for ShapeParams {
    fn default() -> Self {
        Self {
            polygon_sides: 5,
            star_spikes: 5,
            star_inner_ratio: 2.5,
        }
    }
}

/// Vertex list for the polygonal shapes; stars with up to 8 spikes stay inline.
pub type Vertices = SmallVec<[kurbo::Point; 16]>;

/// Radius of a circle gesture: the Euclidean distance from `start` to `end`.
pub fn circle_radius(start: Point, end: Point) -> f64 {
    start.distance(end)
}

/// A single freehand segment.
pub fn segment_path(from: Point, to: Point) -> BezPath {
    let mut path = BezPath::new();
    path.move_to(from);
    path.line_to(to);
    path
}

/// Build the outline for a completed gesture.
///
/// Returns `None` for [`ShapeKind::Line`], which is drawn progressively with
/// [`segment_path`] rather than at release. Degenerate gestures (zero radius,
/// zero-area rectangle) yield an empty path.
pub fn shape_path(
    kind: ShapeKind,
    start: Point,
    end: Point,
    params: &ShapeParams,
) -> Option<BezPath> {
    let path = match kind {
        ShapeKind::Line => return None,
        ShapeKind::Circle => circle(start, end),
        ShapeKind::Rectangle => rectangle(start, end),
        ShapeKind::Polygon => closed_outline(&polygon_vertices(start, end, params.polygon_sides)),
        ShapeKind::Star => {
            closed_outline(&star_vertices(start, end, params.star_spikes, params.star_inner_ratio))
        }
    };
    Some(path)
}

fn circle(start: Point, end: Point) -> BezPath {
    let radius = circle_radius(start, end);
    if radius <= 0.0 {
        return BezPath::new();
    }
    Circle::new(start, radius).to_path(CURVE_TOLERANCE)
}

fn rectangle(start: Point, end: Point) -> BezPath {
    // from_points takes min/max per axis, so drags up or left still work.
    let rect = Rect::from_points(start, end);
    if rect.width() == 0.0 && rect.height() == 0.0 {
        return BezPath::new();
    }
    rect.to_path(CURVE_TOLERANCE)
}

/// Regular polygon vertices around `start`.
///
/// The first vertex always sits on the positive x-axis, independent of
/// where `end` is; only the distance to `end` matters.
pub fn polygon_vertices(start: Point, end: Point, sides: u32) -> Vertices {
    let radius = start.distance(end);
    if radius <= 0.0 {
        return Vertices::new();
    }
    let sides = sides.max(3);
    let center = kurbo::Point::from(start);
    let angle = TAU / sides as f64;

    (0..sides)
        .map(|i| {
            let theta = angle * i as f64;
            kurbo::Point::new(
                center.x + radius * theta.cos(),
                center.y + radius * theta.sin(),
            )
        })
        .collect()
}

/// Star vertices around `start`, alternating outer and inner radii.
///
/// Starts at rotation 3π/2 (straight up) and advances π/spikes per vertex.
/// The trailing vertex repeats the top spike at `(start.x, start.y - outer)`.
pub fn star_vertices(start: Point, end: Point, spikes: u32, inner_ratio: f64) -> Vertices {
    let outer = start.distance(end);
    if outer <= 0.0 {
        return Vertices::new();
    }
    let spikes = spikes.max(2);
    let inner = outer / inner_ratio;
    let center = kurbo::Point::from(start);
    let step = PI / spikes as f64;
    let mut rotation = PI / 2.0 * 3.0;

    let mut vertices = Vertices::with_capacity(spikes as usize * 2 + 1);
    for _ in 0..spikes {
        for radius in [outer, inner] {
            vertices.push(kurbo::Point::new(
                center.x + rotation.cos() * radius,
                center.y + rotation.sin() * radius,
            ));
            rotation += step;
        }
    }
    vertices.push(kurbo::Point::new(center.x, center.y - outer));
    vertices
}

fn closed_outline(vertices: &[kurbo::Point]) -> BezPath {
    let mut path = BezPath::new();
    let Some((first, rest)) = vertices.split_first() else {
        return path;
    };
    path.move_to(*first);
    for &v in rest {
        path.line_to(v);
    }
    path.close_path();
    path
}
