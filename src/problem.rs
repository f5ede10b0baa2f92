use crate::geometry::GeometryKind;
use serde::{Deserialize, Serialize};

/// Text handed to the tutor in place of an uploaded image. No OCR is done.
pub const IMAGE_PLACEHOLDER: &str = "[Image uploaded] The learner attached a picture of the problem.";

/// Opaque reference to an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The problem a tutoring session is about. Produced once per analysis
/// action and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemContext {
    text: String,
    #[serde(default)]
    image_ref: Option<ImageRef>,
    #[serde(rename = "type")]
    kind: GeometryKind,
}

impl ProblemContext {
    pub fn new(kind: GeometryKind, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_ref: None,
            kind,
        }
    }

    /// Typed problem statement. Surrounding whitespace is dropped.
    pub fn from_text(kind: GeometryKind, text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self::new(kind, text))
    }

    pub fn from_image(kind: GeometryKind, image_ref: ImageRef) -> Self {
        Self {
            text: IMAGE_PLACEHOLDER.to_string(),
            image_ref: Some(image_ref),
            kind,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn image_ref(&self) -> Option<&ImageRef> {
        self.image_ref.as_ref()
    }

    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    pub fn signals_image(&self) -> bool {
        self.image_ref.is_some() || self.text.contains("[Image uploaded]")
    }
}

#[cfg(test)]
mod tests {
    use super::{ImageRef, ProblemContext};
    use crate::geometry::GeometryKind;

    #[test]
    fn blank_text_is_refused() {
        assert!(ProblemContext::from_text(GeometryKind::Cube, "   ").is_none());
        let context = ProblemContext::from_text(GeometryKind::Cube, "  edge is 3 cm ")
            .expect("text context should build");
        assert_eq!(context.text(), "edge is 3 cm");
        assert!(!context.signals_image());
    }

    #[test]
    fn image_context_carries_placeholder() {
        let context = ProblemContext::from_image(GeometryKind::Complex, ImageRef::new("upload-1"));
        assert!(context.signals_image());
        assert_eq!(context.image_ref().map(ImageRef::as_str), Some("upload-1"));
    }

    #[test]
    fn serializes_kind_as_type() {
        let context = ProblemContext::new(GeometryKind::Frustum, "x");
        let value = serde_json::to_value(&context).expect("context should serialize");
        assert_eq!(value["type"], "frustum");
    }
}
