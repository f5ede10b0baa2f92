//! Static formula knowledge base, keyed by primitive kind.

use crate::geometry::GeometryKind;

pub mod retrieve;

pub use retrieve::{retrieve, retrieve_named};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnowledgeEntry {
    pub definition: &'static str,
    pub formulas: &'static [&'static str],
    pub properties: &'static [&'static str],
}

const CUBE: KnowledgeEntry = KnowledgeEntry {
    definition: "A cube is a solid bounded by six congruent square faces, with three faces meeting at each vertex.",
    formulas: &[
        "Volume = s³",
        "Surface Area = 6s²",
        "Face Diagonal = s√2",
        "Space Diagonal = s√3",
    ],
    properties: &[
        "6 faces, 12 edges, 8 vertices",
        "All edges have equal length s",
        "Opposite faces are parallel and every face meets its neighbours at right angles",
    ],
};

const PYRAMID: KnowledgeEntry = KnowledgeEntry {
    definition: "A pyramid is a solid formed by joining every vertex of a polygonal base to a single apex point.",
    formulas: &[
        "Volume = (1/3) × Base Area × h",
        "Surface Area = Base Area + Lateral Area",
        "Lateral Area (regular base) = (1/2) × Perimeter × slant height l",
        "Slant Height l = √(h² + a²), where a is the apothem of the base",
    ],
    properties: &[
        "A square pyramid has 5 faces, 8 edges, 5 vertices",
        "Lateral faces are triangles that meet at the apex",
        "The height h is measured perpendicular from the apex to the base plane",
    ],
};

const FRUSTUM: KnowledgeEntry = KnowledgeEntry {
    definition: "A frustum is the part of a pyramid left between its base and a plane cut parallel to the base.",
    formulas: &[
        "Volume = (h/3) × (A₁ + A₂ + √(A₁A₂))",
        "Lateral Surface Area (regular) = (1/2) × (P₁ + P₂) × slant height l",
        "Total Surface Area = A₁ + A₂ + Lateral Surface Area",
        "Slant Height l = √(h² + (a₁ − a₂)²), using the apothems of the two bases",
    ],
    properties: &[
        "The two bases are similar polygons in parallel planes",
        "Lateral faces are trapezoids",
        "A square frustum has 6 faces, 12 edges, 8 vertices",
    ],
};

const COMPLEX: KnowledgeEntry = KnowledgeEntry {
    definition: "A polyhedron is a solid bounded by flat polygonal faces; complex solids are often split into simpler primitives.",
    formulas: &[
        "Euler's formula: V − E + F = 2",
        "Volume of a composite solid = sum of the Volumes of its parts",
        "Surface Area of a composite solid = sum of the exposed face Areas",
    ],
    properties: &[
        "Count faces, edges and vertices before choosing a formula",
        "Look for prisms, pyramids or frustums hidden inside the shape",
    ],
};

/// Entry for `kind`. Every kind has one, so lookups never fail.
pub fn lookup(kind: GeometryKind) -> &'static KnowledgeEntry {
    match kind {
        GeometryKind::Cube => &CUBE,
        GeometryKind::Pyramid => &PYRAMID,
        GeometryKind::Frustum => &FRUSTUM,
        GeometryKind::Complex => &COMPLEX,
    }
}

/// Entry for a kind name; names the knowledge base does not know fall back
/// to the general entry.
pub fn lookup_named(kind_name: &str) -> &'static KnowledgeEntry {
    lookup(GeometryKind::parse_or_default(kind_name))
}

#[cfg(test)]
mod tests {
    use super::{lookup, lookup_named};
    use crate::geometry::GeometryKind;

    #[test]
    fn every_kind_has_definition_formulas_and_properties() {
        for kind in GeometryKind::CHOICES {
            let entry = lookup(kind);
            assert!(!entry.definition.is_empty());
            assert!(!entry.formulas.is_empty());
            assert!(!entry.properties.is_empty());
        }
    }

    #[test]
    fn unknown_kind_name_uses_general_entry() {
        assert_eq!(lookup_named("icosahedron"), lookup(GeometryKind::Complex));
        assert_eq!(lookup_named("Cube"), lookup(GeometryKind::Cube));
    }

    #[test]
    fn cube_volume_and_area_formulas_are_separable() {
        let entry = lookup(GeometryKind::Cube);
        let volume: Vec<_> = entry
            .formulas
            .iter()
            .filter(|formula| formula.contains("Volume"))
            .collect();
        assert_eq!(volume, vec![&"Volume = s³"]);
    }
}
