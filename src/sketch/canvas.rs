use crate::geometry::GeometryKind;
use crate::sketch::templates::TemplateLibrary;
use crate::sketch::{smooth_stroke, CommittedCurve, CurveSource, PathCurve, Point};
use tracing::debug;

/// Samples closer than this to the previous one are dropped as jitter.
pub const DEFAULT_MIN_POINT_DISTANCE: f32 = 4.0;

/// What a canvas transition changed, for whoever redraws the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasChange {
    Unchanged,
    StrokeStarted,
    StrokeExtended { points: usize },
    StrokeCommitted { index: usize },
    StrokeDiscarded,
    TemplateInserted { kind: GeometryKind, index: usize },
    Undone { remaining: usize },
    Cleared,
}

impl CanvasChange {
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Free-hand sketch surface: committed curves, the stroke being drawn and
/// the primitive kind the user has confirmed so far.
#[derive(Debug, Clone)]
pub struct SketchCanvas {
    curves: Vec<CommittedCurve>,
    stroke: Vec<Point>,
    drawing: bool,
    confirmed_kind: GeometryKind,
    min_point_distance: f32,
    templates: TemplateLibrary,
}

impl Default for SketchCanvas {
    fn default() -> Self {
        Self::new(TemplateLibrary::builtin())
    }
}

impl SketchCanvas {
    pub fn new(templates: TemplateLibrary) -> Self {
        Self {
            curves: Vec::new(),
            stroke: Vec::new(),
            drawing: false,
            confirmed_kind: GeometryKind::Complex,
            min_point_distance: DEFAULT_MIN_POINT_DISTANCE,
            templates,
        }
    }

    pub fn with_min_point_distance(mut self, distance: f32) -> Self {
        self.min_point_distance = distance.max(0.0);
        self
    }

    pub fn curves(&self) -> &[CommittedCurve] {
        &self.curves
    }

    pub fn current_stroke(&self) -> &[Point] {
        &self.stroke
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn confirmed_kind(&self) -> GeometryKind {
        self.confirmed_kind
    }

    pub fn templates(&self) -> &TemplateLibrary {
        &self.templates
    }

    /// Live preview of the stroke in progress.
    pub fn stroke_preview(&self) -> PathCurve {
        smooth_stroke(&self.stroke)
    }

    pub fn press(&mut self, point: Point) -> CanvasChange {
        if self.drawing {
            return CanvasChange::Unchanged;
        }
        self.drawing = true;
        self.stroke.clear();
        self.stroke.push(point);
        CanvasChange::StrokeStarted
    }

    pub fn move_to(&mut self, point: Point) -> CanvasChange {
        if !self.drawing {
            return CanvasChange::Unchanged;
        }
        let far_enough = match self.stroke.last() {
            Some(last) => last.distance(point) > self.min_point_distance,
            None => true,
        };
        if !far_enough {
            return CanvasChange::Unchanged;
        }
        self.stroke.push(point);
        CanvasChange::StrokeExtended {
            points: self.stroke.len(),
        }
    }

    pub fn release(&mut self) -> CanvasChange {
        if !self.drawing {
            return CanvasChange::Unchanged;
        }
        self.drawing = false;
        let stroke = std::mem::take(&mut self.stroke);
        if stroke.len() < 2 {
            debug!(points = stroke.len(), "discarding stroke");
            return CanvasChange::StrokeDiscarded;
        }

        self.curves.push(CommittedCurve {
            curve: smooth_stroke(&stroke),
            source: CurveSource::Freehand,
        });
        debug!(points = stroke.len(), curves = self.curves.len(), "committed stroke");
        CanvasChange::StrokeCommitted {
            index: self.curves.len() - 1,
        }
    }

    /// Pointer left the canvas; finishes the stroke like a release.
    pub fn leave(&mut self) -> CanvasChange {
        self.release()
    }

    pub fn insert_template(&mut self, kind: GeometryKind) -> CanvasChange {
        let Some(curve) = self.templates.curve(kind).cloned() else {
            debug!(%kind, "no template for kind");
            return CanvasChange::Unchanged;
        };
        self.cancel_stroke();
        self.curves.push(CommittedCurve {
            curve,
            source: CurveSource::Template(kind),
        });
        self.confirmed_kind = kind;
        debug!(%kind, curves = self.curves.len(), "inserted template");
        CanvasChange::TemplateInserted {
            kind,
            index: self.curves.len() - 1,
        }
    }

    /// Removes the most recent curve. The confirmed kind follows the newest
    /// template still on the canvas, so removing the only template reverts it.
    pub fn undo(&mut self) -> CanvasChange {
        let had_stroke = self.cancel_stroke();
        if self.curves.pop().is_none() {
            return if had_stroke {
                CanvasChange::StrokeDiscarded
            } else {
                CanvasChange::Unchanged
            };
        }
        self.confirmed_kind = self
            .curves
            .iter()
            .rev()
            .find_map(|committed| committed.source.template_kind())
            .unwrap_or_default();
        CanvasChange::Undone {
            remaining: self.curves.len(),
        }
    }

    pub fn clear(&mut self) -> CanvasChange {
        self.cancel_stroke();
        self.curves.clear();
        self.confirmed_kind = GeometryKind::Complex;
        CanvasChange::Cleared
    }

    fn cancel_stroke(&mut self) -> bool {
        let had_stroke = self.drawing || !self.stroke.is_empty();
        self.drawing = false;
        self.stroke.clear();
        had_stroke
    }
}
