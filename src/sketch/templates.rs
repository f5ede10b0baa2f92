use crate::geometry::GeometryKind;
use crate::sketch::{PathCurve, Segment};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

const BUILTIN_CUBE_TEMPLATE: &str = include_str!("templates_builtin/cube.json");
const BUILTIN_PYRAMID_TEMPLATE: &str = include_str!("templates_builtin/pyramid.json");
const BUILTIN_FRUSTUM_TEMPLATE: &str = include_str!("templates_builtin/frustum.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMeta {
    pub kind: GeometryKind,
    pub title: String,
    pub version: String,
}

/// A pre-authored curve for a canonical primitive, inserted verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDocument {
    pub meta: TemplateMeta,
    pub curve: PathCurve,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateLoadDiagnostic {
    pub template_ref: String,
    pub reason: String,
}

impl TemplateLoadDiagnostic {
    pub fn to_log_line(&self) -> String {
        format!(
            "template load rejected template_ref={} reason={}",
            self.template_ref, self.reason
        )
    }
}

/// Fixed set of template curves keyed by primitive kind.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: BTreeMap<&'static str, TemplateDocument>,
    diagnostics: Vec<TemplateLoadDiagnostic>,
}

impl TemplateLibrary {
    pub fn builtin() -> Self {
        Self::from_sources(&[
            ("embedded:cube", BUILTIN_CUBE_TEMPLATE),
            ("embedded:pyramid", BUILTIN_PYRAMID_TEMPLATE),
            ("embedded:frustum", BUILTIN_FRUSTUM_TEMPLATE),
        ])
    }

    pub fn from_sources(sources: &[(&str, &str)]) -> Self {
        let mut library = Self::default();
        for (template_ref, raw_template) in sources {
            match parse_and_validate_template(raw_template, template_ref) {
                Ok(document) => {
                    library
                        .templates
                        .insert(document.meta.kind.as_str(), document);
                }
                Err(reason) => {
                    let diagnostic = TemplateLoadDiagnostic {
                        template_ref: template_ref.to_string(),
                        reason,
                    };
                    warn!("{}", diagnostic.to_log_line());
                    library.diagnostics.push(diagnostic);
                }
            }
        }
        library
    }

    pub fn get(&self, kind: GeometryKind) -> Option<&TemplateDocument> {
        self.templates.get(kind.as_str())
    }

    pub fn curve(&self, kind: GeometryKind) -> Option<&PathCurve> {
        self.get(kind).map(|document| &document.curve)
    }

    /// Kinds that have an insertable template, in confirmation-dialog order.
    pub fn kinds(&self) -> Vec<GeometryKind> {
        GeometryKind::CHOICES
            .into_iter()
            .filter(|kind| self.get(*kind).is_some())
            .collect()
    }

    pub fn diagnostics(&self) -> &[TemplateLoadDiagnostic] {
        &self.diagnostics
    }
}

fn parse_and_validate_template(
    raw_template: &str,
    template_ref: &str,
) -> Result<TemplateDocument, String> {
    let mut document: TemplateDocument = serde_json::from_str(raw_template)
        .map_err(|err| format!("template parse failed ({template_ref}): {err}"))?;

    document.meta.title = document.meta.title.trim().to_string();
    document.meta.version = document.meta.version.trim().to_string();

    if !document.meta.kind.is_primitive() {
        return Err("meta.kind must name a primitive".to_string());
    }
    if document.meta.title.is_empty() {
        return Err("meta.title is required".to_string());
    }
    if document.meta.version.is_empty() {
        return Err("meta.version is required".to_string());
    }
    match document.curve.segments().first() {
        Some(Segment::MoveTo { .. }) => {}
        Some(_) => return Err("curve must start with move_to".to_string()),
        None => return Err("curve is empty".to_string()),
    }
    let all_finite = document.curve.segments().iter().all(|segment| match segment {
        Segment::MoveTo { to } | Segment::LineTo { to } => to.x.is_finite() && to.y.is_finite(),
        Segment::QuadTo { ctrl, to } => {
            ctrl.x.is_finite() && ctrl.y.is_finite() && to.x.is_finite() && to.y.is_finite()
        }
    });
    if !all_finite {
        return Err("curve coordinates must be finite".to_string());
    }

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::{TemplateLibrary, BUILTIN_CUBE_TEMPLATE};
    use crate::geometry::GeometryKind;
    use crate::sketch::Segment;

    #[test]
    fn builtin_library_loads_every_primitive() {
        let library = TemplateLibrary::builtin();
        assert!(library.diagnostics().is_empty());
        assert_eq!(
            library.kinds(),
            vec![
                GeometryKind::Cube,
                GeometryKind::Pyramid,
                GeometryKind::Frustum
            ]
        );
        assert!(library.get(GeometryKind::Complex).is_none());
    }

    #[test]
    fn builtin_curves_start_with_move_and_use_straight_edges() {
        let library = TemplateLibrary::builtin();
        for kind in library.kinds() {
            let curve = library.curve(kind).expect("template curve should exist");
            assert!(matches!(curve.segments()[0], Segment::MoveTo { .. }));
            assert!(curve.segments().len() > 8);
            assert!(curve
                .segments()
                .iter()
                .all(|segment| !matches!(segment, Segment::QuadTo { .. })));
            let edges = curve
                .segments()
                .iter()
                .filter(|segment| matches!(segment, Segment::LineTo { .. }))
                .count();
            let expected = match kind {
                GeometryKind::Pyramid => 8,
                _ => 12,
            };
            assert_eq!(edges, expected, "{kind} template edge count");
        }
    }

    #[test]
    fn invalid_templates_are_excluded_with_diagnostics() {
        let library = TemplateLibrary::from_sources(&[
            ("good", BUILTIN_CUBE_TEMPLATE),
            ("broken", "{ not json"),
            (
                "complex",
                r#"{"meta":{"kind":"default","title":"x","version":"1"},"curve":[{"op":"move_to","to":{"x":0,"y":0}}]}"#,
            ),
            (
                "no-move",
                r#"{"meta":{"kind":"pyramid","title":"x","version":"1"},"curve":[{"op":"line_to","to":{"x":0,"y":0}}]}"#,
            ),
        ]);

        assert_eq!(library.kinds(), vec![GeometryKind::Cube]);
        let reasons: Vec<&str> = library
            .diagnostics()
            .iter()
            .map(|diagnostic| diagnostic.template_ref.as_str())
            .collect();
        assert_eq!(reasons, vec!["broken", "complex", "no-move"]);
        assert!(library.diagnostics()[0].reason.contains("parse failed"));
    }
}
