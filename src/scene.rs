//! Wireframe scene descriptions handed to a rendering surface.

use crate::geometry::GeometryKind;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

const fn v(x: f32, y: f32, z: f32) -> Vertex {
    Vertex { x, y, z }
}

/// Unit-sized solid as vertices plus index pairs for its edges. Y is up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneDescription {
    pub kind: GeometryKind,
    pub vertices: Vec<Vertex>,
    pub edges: Vec<(usize, usize)>,
}

impl SceneDescription {
    /// `None` for complex solids, which have no canonical model.
    pub fn for_kind(kind: GeometryKind) -> Option<Self> {
        match kind {
            GeometryKind::Cube => Some(square_frustum(kind, 1.0, 1.0)),
            GeometryKind::Frustum => Some(square_frustum(kind, 1.0, 0.5)),
            GeometryKind::Pyramid => {
                let mut vertices = square_ring(0.5, -0.5).to_vec();
                vertices.push(v(0.0, 0.5, 0.0));
                let mut edges = ring_edges(0);
                edges.extend((0..4).map(|i| (i, 4)));
                Some(Self {
                    kind,
                    vertices,
                    edges,
                })
            }
            GeometryKind::Complex => None,
        }
    }

    /// Orthographic projection onto the screen plane after rotating `yaw`
    /// radians about the vertical axis and tilting by `pitch`.
    pub fn project(&self, yaw: f32, pitch: f32) -> Vec<(f32, f32)> {
        let (sy, cy) = yaw.sin_cos();
        let (sp, cp) = pitch.sin_cos();
        self.vertices
            .iter()
            .map(|vertex| {
                let x = vertex.x * cy + vertex.z * sy;
                let z = -vertex.x * sy + vertex.z * cy;
                let y = vertex.y * cp - z * sp;
                (x, -y)
            })
            .collect()
    }
}

fn square_ring(half: f32, y: f32) -> [Vertex; 4] {
    [v(-half, y, -half), v(half, y, -half), v(half, y, half), v(-half, y, half)]
}

fn ring_edges(offset: usize) -> Vec<(usize, usize)> {
    (0..4).map(|i| (offset + i, offset + (i + 1) % 4)).collect()
}

fn square_frustum(kind: GeometryKind, bottom: f32, top: f32) -> SceneDescription {
    let mut vertices = square_ring(bottom / 2.0, -0.5).to_vec();
    vertices.extend(square_ring(top / 2.0, 0.5));
    let mut edges = ring_edges(0);
    edges.extend(ring_edges(4));
    edges.extend((0..4).map(|i| (i, i + 4)));
    SceneDescription {
        kind,
        vertices,
        edges,
    }
}
