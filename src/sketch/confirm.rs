//! Human-in-the-loop shape confirmation.
//!
//! Strokes are never classified automatically. A canvas with a template on it
//! already names its primitive; a free-hand-only canvas has to be confirmed
//! by the user before a [`ProblemContext`] exists.

use crate::geometry::GeometryKind;
use crate::problem::ProblemContext;
use crate::sketch::SketchCanvas;
use tracing::{debug, info};

#[derive(Debug, PartialEq)]
pub enum AnalyzeOutcome {
    /// Nothing committed; the solve action is refused silently.
    Empty,
    /// A template fixed the kind, so no confirmation is needed.
    Ready(ProblemContext),
    /// Free-hand only; the user must pick a kind or cancel.
    NeedsConfirmation(PendingConfirmation),
}

/// An open confirmation dialog. Consumed by either `pick` or `cancel`.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a pending confirmation must be picked or cancelled"]
pub struct PendingConfirmation {
    curve_count: usize,
}

impl PendingConfirmation {
    pub fn options(&self) -> &'static [GeometryKind] {
        &GeometryKind::CHOICES
    }

    pub fn curve_count(&self) -> usize {
        self.curve_count
    }

    pub fn pick(self, kind: GeometryKind) -> ProblemContext {
        info!(%kind, curves = self.curve_count, "shape confirmed");
        ProblemContext::new(kind, confirmed_description(kind))
    }

    pub fn cancel(self) {
        debug!(curves = self.curve_count, "shape confirmation cancelled");
    }
}

pub fn analyze(canvas: &SketchCanvas) -> AnalyzeOutcome {
    if canvas.is_empty() {
        return AnalyzeOutcome::Empty;
    }

    let kind = canvas.confirmed_kind();
    if kind.is_primitive() {
        info!(%kind, "template sketch submitted");
        return AnalyzeOutcome::Ready(ProblemContext::new(
            kind,
            format!("{} sketch submitted", kind.label()),
        ));
    }

    AnalyzeOutcome::NeedsConfirmation(PendingConfirmation {
        curve_count: canvas.curves().len(),
    })
}

fn confirmed_description(kind: GeometryKind) -> &'static str {
    match kind {
        GeometryKind::Cube => {
            "The learner sketched a cube and confirmed the shape. Dimensions are not given yet."
        }
        GeometryKind::Pyramid => {
            "The learner sketched a pyramid and confirmed the shape. Base and height are not given yet."
        }
        GeometryKind::Frustum => {
            "The learner sketched a frustum (a pyramid with its top cut off) and confirmed the shape. \
             Base sizes and height are not given yet."
        }
        GeometryKind::Complex => {
            "The learner sketched an irregular or complex solid that does not match a known primitive. \
             Do not guess its geometry: ask the learner to describe its faces and vertices first."
        }
    }
}
