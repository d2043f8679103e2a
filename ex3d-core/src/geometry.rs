/// Geometry primitives: vertex streams, triangles and extruded shapes
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

use crate::material::MaterialSource;

/// A vertex position in millimeters
pub type Vertex = Point3<f64>;

/// Three indices into the owning mesh's vertex list, winding preserved from input
pub type Triangle = [u32; 3];

/// Geometry payload of a scene leaf, as handed over by the shape loader.
///
/// `positions` is `None` when the upstream mesh has no position stream. When
/// `indices` is `None` the geometry is non-indexed and every three consecutive
/// positions form one triangle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    #[serde(default)]
    pub positions: Option<Vec<Vertex>>,
    #[serde(default)]
    pub indices: Option<Vec<u32>>,
    #[serde(default)]
    pub material: MaterialSource,
}

impl MeshData {
    pub fn new(positions: Vec<Vertex>, triangles: &[Triangle]) -> Self {
        Self {
            positions: Some(positions),
            indices: Some(triangles.iter().flatten().copied().collect()),
            material: MaterialSource::Colorless,
        }
    }

    pub fn with_material(mut self, material: MaterialSource) -> Self {
        self.material = material;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.as_ref().map_or(0, Vec::len)
    }

    /// Create an axis-aligned square of side `size` in the XY plane, two triangles
    pub fn square(size: f64) -> Self {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(size, 0.0, 0.0),
            Point3::new(size, size, 0.0),
            Point3::new(0.0, size, 0.0),
        ];
        Self::new(positions, &[[0, 1, 2], [0, 2, 3]])
    }

    /// Extrude a convex outline along +Z by `depth`.
    ///
    /// The outline is fan-triangulated from its first point, so it must be
    /// convex and counter-clockwise for outward-facing caps. Side walls are
    /// emitted as one quad (two triangles) per outline edge.
    pub fn prism(outline: &[Point2<f64>], depth: f64) -> Self {
        let n = outline.len();
        if n < 3 {
            return Self {
                positions: Some(Vec::new()),
                indices: Some(Vec::new()),
                material: MaterialSource::Colorless,
            };
        }

        let mut positions = Vec::with_capacity(n * 2);
        positions.extend(outline.iter().map(|p| Point3::new(p.x, p.y, 0.0)));
        positions.extend(outline.iter().map(|p| Point3::new(p.x, p.y, depth)));

        let n = n as u32;
        let mut triangles = Vec::with_capacity((n as usize - 2) * 2 + n as usize * 2);

        // Bottom cap faces -Z, top cap faces +Z
        for i in 1..n - 1 {
            triangles.push([0, i + 1, i]);
            triangles.push([n, n + i, n + i + 1]);
        }

        for i in 0..n {
            let j = (i + 1) % n;
            triangles.push([i, j, n + j]);
            triangles.push([i, n + j, n + i]);
        }

        Self::new(positions, &triangles)
    }

    /// Regular polygon outline with `sides` corners on a circle of `radius`
    pub fn regular_outline(sides: usize, radius: f64) -> Vec<Point2<f64>> {
        (0..sides)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / sides as f64;
                Point2::new(radius * angle.cos(), radius * angle.sin())
            })
            .collect()
    }
}

/// A leaf after flattening: world-space copies of its vertices and triangles
#[derive(Debug, Clone, PartialEq)]
pub struct LeafMesh {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
    /// Index into the export's material table.
    pub material_id: usize,
}

impl LeafMesh {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.triangles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_layout() {
        let square = MeshData::square(1.0);
        assert_eq!(square.vertex_count(), 4);
        assert_eq!(square.indices.as_ref().unwrap().len(), 6);
    }

    #[test]
    fn test_prism_counts() {
        let outline = MeshData::regular_outline(6, 5.0);
        let prism = MeshData::prism(&outline, 3.0);

        assert_eq!(prism.vertex_count(), 12);
        // 2 caps of 4 triangles + 6 walls of 2 triangles
        assert_eq!(prism.indices.as_ref().unwrap().len(), (8 + 12) * 3);

        let max = prism.vertex_count() as u32;
        assert!(prism.indices.unwrap().iter().all(|&i| i < max));
    }

    #[test]
    fn test_prism_degenerate_outline() {
        let prism = MeshData::prism(&[Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)], 1.0);
        assert_eq!(prism.vertex_count(), 0);
    }

    #[test]
    fn test_mesh_data_json_defaults() {
        let data: MeshData = serde_json::from_str("{}").unwrap();
        assert!(data.positions.is_none());
        assert_eq!(data.material, MaterialSource::Colorless);
    }
}
