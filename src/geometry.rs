use serde::{Deserialize, Serialize};
use std::fmt;

/// Solid primitives the tutor can reason about.
///
/// `Complex` doubles as the "no confirmed primitive" marker: a canvas that
/// only holds free-hand strokes carries it until the user confirms a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    Cube,
    Pyramid,
    Frustum,
    #[default]
    #[serde(rename = "default", alias = "complex", alias = "other")]
    Complex,
}

impl GeometryKind {
    /// Options offered by the confirmation dialog, in display order.
    pub const CHOICES: [GeometryKind; 4] = [
        GeometryKind::Cube,
        GeometryKind::Pyramid,
        GeometryKind::Frustum,
        GeometryKind::Complex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cube => "cube",
            Self::Pyramid => "pyramid",
            Self::Frustum => "frustum",
            Self::Complex => "default",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cube => "Cube",
            Self::Pyramid => "Pyramid",
            Self::Frustum => "Frustum",
            Self::Complex => "Other / Complex",
        }
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, Self::Complex)
    }

    /// Parse a kind name, case-insensitively. Returns `None` for names the
    /// knowledge base does not know.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cube" => Some(Self::Cube),
            "pyramid" => Some(Self::Pyramid),
            "frustum" => Some(Self::Frustum),
            "default" | "complex" | "other" => Some(Self::Complex),
            _ => None,
        }
    }

    /// Like [`GeometryKind::parse`], falling back to `Complex`.
    pub fn parse_or_default(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_default()
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::GeometryKind;

    #[test]
    fn parse_accepts_aliases_for_complex() {
        assert_eq!(GeometryKind::parse("Default"), Some(GeometryKind::Complex));
        assert_eq!(GeometryKind::parse("other"), Some(GeometryKind::Complex));
        assert_eq!(GeometryKind::parse(" FRUSTUM "), Some(GeometryKind::Frustum));
    }

    #[test]
    fn unknown_names_fall_back_to_complex() {
        assert_eq!(GeometryKind::parse("dodecahedron"), None);
        assert_eq!(
            GeometryKind::parse_or_default("dodecahedron"),
            GeometryKind::Complex
        );
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&GeometryKind::Complex).expect("kind should serialize");
        assert_eq!(json, "\"default\"");
        let parsed: GeometryKind =
            serde_json::from_str("\"other\"").expect("alias should deserialize");
        assert_eq!(parsed, GeometryKind::Complex);
    }
}
