//! Style configuration supplied by the host page.
//!
//! The host keeps the active shape, color, and brush size in its URL query
//! string (`?shape=star&color=%23ff0000&brushSize=12`). This module parses
//! that representation into a typed [`StyleConfig`] and reports what changed
//! between two configs so the engine can react explicitly instead of reading
//! ambient page state.

use crate::model::{Color, ShapeKind, StrokeStyle, hex_val};
use serde::{Deserialize, Serialize};
use winnow::combinator::{opt, preceded};
use winnow::prelude::*;
use winnow::token::take_till;

pub const MIN_BRUSH_SIZE: u32 = 1;
pub const MAX_BRUSH_SIZE: u32 = 50;
pub const DEFAULT_BRUSH_SIZE: u32 = 5;

/// Share of the viewport height the square canvas occupies.
const CANVAS_VIEWPORT_RATIO: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    UnknownShape(#[from] crate::model::UnknownShape),
    #[error("invalid color '{0}'")]
    InvalidColor(String),
    #[error("invalid brush size '{0}'")]
    InvalidBrushSize(String),
    #[error("malformed query string: {0}")]
    Query(String),
}

/// Drawing style selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StyleConfig {
    pub shape: ShapeKind,
    pub stroke_color: Color,
    /// Brush size in pixels, kept within `MIN_BRUSH_SIZE..=MAX_BRUSH_SIZE`.
    pub line_width: u32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            shape: ShapeKind::Line,
            stroke_color: Color::BLACK,
            line_width: DEFAULT_BRUSH_SIZE,
        }
    }
}

/// Which parts of the style differ between two configs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StyleChange {
    pub shape: bool,
    /// Color or brush size changed; the paint context must be reconfigured.
    pub stroke: bool,
}

impl StyleChange {
    pub fn is_empty(&self) -> bool {
        !self.shape && !self.stroke
    }
}

impl StyleConfig {
    pub fn with_shape(mut self, shape: ShapeKind) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.stroke_color = color;
        self
    }

    /// Set the brush size, clamped to the slider range.
    pub fn with_line_width(mut self, width: u32) -> Self {
        self.line_width = width.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
        self
    }

    /// The paint context this config asks for.
    pub fn stroke_style(&self) -> StrokeStyle {
        StrokeStyle::new(self.stroke_color, self.line_width as f32)
    }

    pub fn diff(&self, next: &StyleConfig) -> StyleChange {
        StyleChange {
            shape: self.shape != next.shape,
            stroke: self.stroke_color != next.stroke_color || self.line_width != next.line_width,
        }
    }

    /// Parse `shape`, `color`, and `brushSize` out of a query string.
    ///
    /// Missing keys keep their defaults and unknown keys are ignored. An
    /// unrecognized shape name is an error rather than a silent fallback.
    pub fn from_query(query: &str) -> Result<Self, ConfigError> {
        let mut config = StyleConfig::default();
        for (key, value) in parse_query(query)? {
            match key.as_str() {
                "shape" => config.shape = value.parse()?,
                "color" => {
                    config.stroke_color =
                        Color::from_hex(&value).ok_or(ConfigError::InvalidColor(value))?;
                }
                "brushSize" => config = config.with_line_width(parse_brush_size(&value)?),
                other => log::trace!("ignoring query key '{other}'"),
            }
        }
        Ok(config)
    }

    /// Emit the canonical query string (without a leading `?`).
    pub fn to_query(&self) -> String {
        format!(
            "shape={}&color={}&brushSize={}",
            self.shape,
            self.stroke_color.to_hex().replace('#', "%23"),
            self.line_width
        )
    }
}

/// Side length of the square canvas for a viewport of the given height.
pub fn canvas_side_for_viewport(viewport_height: f64) -> u32 {
    if !viewport_height.is_finite() || viewport_height <= 0.0 {
        return 0;
    }
    (viewport_height * CANVAS_VIEWPORT_RATIO).floor() as u32
}

fn parse_brush_size(value: &str) -> Result<u32, ConfigError> {
    let size: f64 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidBrushSize(value.to_string()))?;
    if !size.is_finite() {
        return Err(ConfigError::InvalidBrushSize(value.to_string()));
    }
    Ok(size.trunc().clamp(0.0, u32::MAX as f64) as u32)
}

// ─── Query string parsing ────────────────────────────────────────────────

fn parse_query(input: &str) -> Result<Vec<(String, String)>, ConfigError> {
    let mut rest = input.strip_prefix('?').unwrap_or(input);
    let mut pairs = Vec::new();

    while !rest.is_empty() {
        let (key, value) = parse_pair
            .parse_next(&mut rest)
            .map_err(|e| ConfigError::Query(format!("{e}")))?;
        if !key.is_empty() {
            pairs.push((percent_decode(key)?, percent_decode(value.unwrap_or(""))?));
        }
        if rest.starts_with('&') {
            rest = &rest[1..];
        }
    }

    Ok(pairs)
}

fn parse_pair<'a>(input: &mut &'a str) -> ModalResult<(&'a str, Option<&'a str>)> {
    let key = take_till(0.., ['=', '&']).parse_next(input)?;
    let value = opt(preceded('=', take_till(0.., '&'))).parse_next(input)?;
    Ok((key, value))
}

fn percent_decode(s: &str) -> Result<String, ConfigError> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hi = bytes.get(i + 1).copied().and_then(hex_val);
                let lo = bytes.get(i + 2).copied().and_then(hex_val);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => out.push(hi << 4 | lo),
                    _ => return Err(ConfigError::Query(format!("bad escape in '{s}'"))),
                }
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|_| ConfigError::Query(format!("non-UTF-8 value in '{s}'")))
}
