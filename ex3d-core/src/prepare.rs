/// Turns a scene into world-space leaves bound to a shared material table
use tracing::{debug, warn};

use crate::error::{index_u32, ExportError, ExportResult};
use crate::geometry::{LeafMesh, Triangle, Vertex};
use crate::material::{MaterialRegistry, Rgb};
use crate::scene::{Diagnostic, Scene, SceneFlattener};
use crate::transform::transform_vertices;

/// Everything a serializer needs, built fresh for every export call
#[derive(Debug, Clone, Default)]
pub struct PreparedScene {
    /// Leaves with geometry, in traversal order.
    pub leaves: Vec<LeafMesh>,
    pub materials: MaterialRegistry,
    pub diagnostics: Vec<Diagnostic>,
}

/// All leaves concatenated into one vertex array with re-based indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedMesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
}

impl PreparedScene {
    /// Flatten `scene`, transform each leaf into world space and register its colour.
    ///
    /// Empty records are dropped here and never reach the material table.
    pub fn from_scene(scene: &Scene) -> ExportResult<Self> {
        let flattened = SceneFlattener::new(scene).flatten()?;
        let mut prepared = PreparedScene {
            leaves: Vec::with_capacity(flattened.records.len()),
            materials: MaterialRegistry::new(),
            diagnostics: flattened.diagnostics,
        };

        for record in flattened.records {
            if record.is_empty() {
                debug!(node = record.node, name = %record.name, "dropping empty leaf");
                continue;
            }

            let color = match record.material.color() {
                Some(color) => color,
                None => {
                    warn!(node = record.node, "leaf material has no colour, using default gray");
                    prepared
                        .diagnostics
                        .push(Diagnostic::UnsupportedMaterial { node: record.node });
                    Rgb::DEFAULT_GRAY
                }
            };
            let material_id = prepared.materials.register(color);

            let vertices = transform_vertices(&record.vertices_local, &record.world);
            prepared.leaves.push(LeafMesh {
                name: record.name,
                vertices,
                triangles: record.triangles,
                material_id,
            });
        }

        debug!(
            leaves = prepared.leaves.len(),
            materials = prepared.materials.len(),
            "prepared scene"
        );
        Ok(prepared)
    }

    /// Leaves that carry geometry
    pub fn non_empty_leaves(&self) -> impl Iterator<Item = &LeafMesh> {
        self.leaves.iter().filter(|leaf| !leaf.is_empty())
    }

    pub fn vertex_count(&self) -> usize {
        self.non_empty_leaves().map(|l| l.vertices.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.non_empty_leaves().map(|l| l.triangles.len()).sum()
    }

    /// Fail with [`ExportError::EmptyInput`] when nothing is renderable
    pub fn ensure_not_empty(&self) -> ExportResult<()> {
        if self.non_empty_leaves().next().is_none() {
            return Err(ExportError::EmptyInput);
        }
        Ok(())
    }

    /// Concatenate all non-empty leaves, offsetting each leaf's indices by the
    /// number of vertices that precede it.
    pub fn merged(&self) -> ExportResult<MergedMesh> {
        let mut merged = MergedMesh {
            vertices: Vec::with_capacity(self.vertex_count()),
            triangles: Vec::with_capacity(self.triangle_count()),
        };

        for leaf in self.non_empty_leaves() {
            let offset = index_u32(merged.vertices.len())?;
            index_u32(merged.vertices.len() + leaf.vertices.len())?;

            merged.vertices.extend_from_slice(&leaf.vertices);
            merged
                .triangles
                .extend(leaf.triangles.iter().map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]));
        }

        index_u32(merged.triangles.len())?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::MeshData;
    use crate::material::MaterialSource;
    use crate::scene::Node;
    use crate::transform::LocalTransform;
    use nalgebra::Point3;

    const ORANGE: Rgb = Rgb::new(0xFF, 0xA5, 0x00);

    fn two_orange_squares() -> Scene {
        let mut scene = Scene::new();
        let square = MeshData::square(1.0).with_material(MaterialSource::HasColor(ORANGE));
        scene.add_root(Node::mesh(square.clone()).with_name("A"));
        scene.add_root(
            Node::mesh(square)
                .with_name("B")
                .with_transform(LocalTransform::from_translation(10.0, 0.0, 0.0)),
        );
        scene
    }

    #[test]
    fn test_two_squares_share_one_material() {
        let prepared = PreparedScene::from_scene(&two_orange_squares()).unwrap();
        assert_eq!(prepared.materials.len(), 1);
        assert_eq!(prepared.leaves[0].material_id, prepared.leaves[1].material_id);
        assert_eq!(prepared.vertex_count(), 8);
        assert_eq!(prepared.triangle_count(), 4);
    }

    #[test]
    fn test_vertices_are_world_space() {
        let prepared = PreparedScene::from_scene(&two_orange_squares()).unwrap();
        assert_eq!(prepared.leaves[1].vertices[0], Point3::new(10.0, 0.0, 0.0));
        assert_eq!(prepared.leaves[1].vertices[2], Point3::new(11.0, 1.0, 0.0));
    }

    #[test]
    fn test_scene_is_not_mutated() {
        let scene = two_orange_squares();
        let before = scene.clone();
        PreparedScene::from_scene(&scene).unwrap();
        assert_eq!(scene, before);
    }

    #[test]
    fn test_merged_rebases_indices() {
        let prepared = PreparedScene::from_scene(&two_orange_squares()).unwrap();
        let merged = prepared.merged().unwrap();

        assert_eq!(merged.vertices.len(), 8);
        assert_eq!(merged.triangles, vec![[0, 1, 2], [0, 2, 3], [4, 5, 6], [4, 6, 7]]);
    }

    #[test]
    fn test_merged_skips_empty_leaves() {
        let mut scene = two_orange_squares();
        scene.roots.insert(0, scene.nodes.len());
        scene.nodes.push(Node::mesh(MeshData::default()));

        let prepared = PreparedScene::from_scene(&scene).unwrap();
        assert_eq!(prepared.leaves.len(), 2);
        assert_eq!(prepared.materials.len(), 1);
        let merged = prepared.merged().unwrap();
        assert_eq!(merged.triangles[0], [0, 1, 2]);
        assert_eq!(merged.vertices.len(), 8);
    }

    #[test]
    fn test_colorless_leaf_falls_back_to_gray() {
        let mut scene = Scene::new();
        scene.add_root(Node::mesh(MeshData::square(1.0)));

        let prepared = PreparedScene::from_scene(&scene).unwrap();
        let material = prepared.materials.get(prepared.leaves[0].material_id).unwrap();
        assert_eq!(material.color, Rgb::DEFAULT_GRAY);
        assert_eq!(prepared.diagnostics, vec![Diagnostic::UnsupportedMaterial { node: 0 }]);
    }

    #[test]
    fn test_empty_scene_is_rejected() {
        let prepared = PreparedScene::from_scene(&Scene::new()).unwrap();
        assert!(matches!(prepared.ensure_not_empty(), Err(ExportError::EmptyInput)));
    }
}
