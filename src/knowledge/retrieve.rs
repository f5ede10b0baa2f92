use crate::geometry::GeometryKind;
use crate::knowledge::{lookup, KnowledgeEntry};
use tracing::debug;

const VOLUME_TERMS: [&str; 3] = ["volume", "space", "capacity"];
const AREA_TERMS: [&str; 2] = ["area", "surface"];
const MEASURE_TERMS: [&str; 3] = ["diagonal", "height", "slant"];

/// Pick knowledge-base lines relevant to `query` for a prompt.
///
/// Matching is a case-insensitive substring test against fixed keyword
/// sets. The result always starts with the definition line and is identical
/// for identical inputs.
///
/// Formulas are deduplicated: one matched by several keyword sets (say
/// "volume" and "height") appears once, at the position of its first match,
/// instead of once per matching set.
pub fn retrieve(query: &str, kind: GeometryKind) -> String {
    select(query, lookup(kind))
}

/// [`retrieve`] for a kind given by name; unknown names use the general entry.
pub fn retrieve_named(query: &str, kind_name: &str) -> String {
    retrieve(query, GeometryKind::parse_or_default(kind_name))
}

fn select(query: &str, entry: &KnowledgeEntry) -> String {
    let lowered = query.to_lowercase();
    let has_any = |terms: &[&str]| terms.iter().any(|term| lowered.contains(term));

    let mut formulas: Vec<&str> = Vec::new();
    let mut add = |formula: &'static str| {
        if !formulas.contains(&formula) {
            formulas.push(formula);
        }
    };

    if has_any(&VOLUME_TERMS) {
        entry
            .formulas
            .iter()
            .filter(|formula| formula.contains("Volume"))
            .for_each(|formula| add(*formula));
    }
    if has_any(&AREA_TERMS) {
        entry
            .formulas
            .iter()
            .filter(|formula| formula.contains("Area"))
            .for_each(|formula| add(*formula));
    }
    if has_any(&MEASURE_TERMS) {
        entry.formulas.iter().for_each(|formula| add(*formula));
    }

    let mut lines = Vec::with_capacity(formulas.len() + 1);
    lines.push(format!("Definition: {}", entry.definition));
    if formulas.is_empty() {
        lines.push(format!("Key Properties: {}", entry.properties.join("; ")));
    } else {
        lines.extend(formulas.iter().map(|formula| format!("Formula: {formula}")));
    }

    debug!(lines = lines.len(), "retrieved knowledge context");
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{retrieve, retrieve_named};
    use crate::geometry::GeometryKind;

    #[test]
    fn volume_question_gets_volume_formula_only() {
        let context = retrieve("What is the volume?", GeometryKind::Cube);
        assert!(context.starts_with("Definition: A cube"));
        assert!(context.contains("Volume = s³"));
        assert!(!context.contains("Surface Area"));
        assert!(!context.contains("Key Properties"));
    }

    #[test]
    fn area_and_volume_keywords_combine() {
        let context = retrieve("Find the VOLUME and surface area", GeometryKind::Cube);
        assert!(context.contains("Volume = s³"));
        assert!(context.contains("Surface Area = 6s²"));
        assert!(!context.contains("Diagonal"));
    }

    #[test]
    fn measure_keywords_bring_every_formula_once() {
        let context = retrieve("volume from the slant height?", GeometryKind::Pyramid);
        let formula_lines = context
            .lines()
            .filter(|line| line.starts_with("Formula: "))
            .count();
        assert_eq!(formula_lines, 4);
        assert_eq!(context.matches("Volume = (1/3)").count(), 1);
    }

    #[test]
    fn formula_matched_by_two_keyword_sets_is_listed_once() {
        let context = retrieve("volume given the height", GeometryKind::Cube);
        let formula_lines: Vec<&str> = context
            .lines()
            .filter(|line| line.starts_with("Formula: "))
            .collect();
        assert_eq!(formula_lines.first(), Some(&"Formula: Volume = s³"));
        assert_eq!(formula_lines.len(), 4);
        assert_eq!(context.matches("Volume = s³").count(), 1);
    }

    #[test]
    fn unmatched_query_falls_back_to_properties() {
        let context = retrieve("tell me about it", GeometryKind::Pyramid);
        let lines: Vec<&str> = context.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Definition: "));
        assert!(lines[1].starts_with("Key Properties: "));
        assert!(lines[1].contains("apex"));
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        for kind in GeometryKind::CHOICES {
            for query in ["What is the volume?", "surface?", "hmm", "diagonal"] {
                assert_eq!(retrieve(query, kind), retrieve(query, kind));
            }
        }
    }

    #[test]
    fn unknown_kind_name_still_yields_definition() {
        let context = retrieve_named("what is the capacity", "torus");
        assert!(context.starts_with("Definition: A polyhedron"));
        assert!(context.contains("Volume of a composite solid"));
    }
}
