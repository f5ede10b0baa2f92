use crate::geometry::GeometryKind;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

pub mod canvas;
pub mod confirm;
pub mod smoothing;
pub mod templates;

pub use canvas::{CanvasChange, SketchCanvas};
pub use confirm::{analyze, AnalyzeOutcome, PendingConfirmation};
pub use smoothing::smooth_stroke;
pub use templates::{TemplateDocument, TemplateLibrary};

/// Decimal places kept when curve coordinates are emitted.
pub const COORD_DECIMALS: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn midpoint(&self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn rounded(&self) -> Point {
        Point::new(round_coord(self.x), round_coord(self.y))
    }
}

pub fn round_coord(value: f32) -> f32 {
    let scale = 10f32.powi(COORD_DECIMALS);
    (value * scale).round() / scale
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Segment {
    MoveTo { to: Point },
    LineTo { to: Point },
    QuadTo { ctrl: Point, to: Point },
}

impl Segment {
    pub fn end(&self) -> Point {
        match self {
            Self::MoveTo { to } | Self::LineTo { to } | Self::QuadTo { to, .. } => *to,
        }
    }
}

/// Immutable curve descriptor made of move/line/quadratic segments.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathCurve {
    segments: Vec<Segment>,
}

impl PathCurve {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn start(&self) -> Option<Point> {
        self.segments.first().map(Segment::end)
    }

    pub fn end(&self) -> Option<Point> {
        self.segments.last().map(Segment::end)
    }

    /// SVG path data, e.g. `M 10 20 Q 12 22 14 24 L 30 40`.
    pub fn to_svg_path(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            if !out.is_empty() {
                out.push(' ');
            }
            let _ = match segment {
                Segment::MoveTo { to } => write!(out, "M {}", format_point(*to)),
                Segment::LineTo { to } => write!(out, "L {}", format_point(*to)),
                Segment::QuadTo { ctrl, to } => {
                    write!(out, "Q {} {}", format_point(*ctrl), format_point(*to))
                }
            };
        }
        out
    }
}

fn format_point(point: Point) -> String {
    let point = point.rounded();
    format!("{} {}", point.x, point.y)
}

/// Where a committed curve came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "kind", rename_all = "snake_case")]
pub enum CurveSource {
    Freehand,
    Template(GeometryKind),
}

impl CurveSource {
    pub fn template_kind(&self) -> Option<GeometryKind> {
        match self {
            Self::Freehand => None,
            Self::Template(kind) => Some(*kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommittedCurve {
    pub curve: PathCurve,
    pub source: CurveSource,
}
