/// Scene tree and its depth-first flattener
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ExportError, ExportResult};
use crate::geometry::{MeshData, Triangle, Vertex};
use crate::material::MaterialSource;
use crate::transform::{LocalTransform, Transform};

/// Index of a node in its scene's arena
pub type NodeId = usize;

/// A scene node: a group of children or a single mesh leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub transform: LocalTransform,
    pub content: NodeContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeContent {
    Group(Vec<NodeId>),
    Mesh(MeshData),
}

impl Node {
    pub fn group(children: Vec<NodeId>) -> Self {
        Self {
            name: None,
            transform: LocalTransform::identity(),
            content: NodeContent::Group(children),
        }
    }

    pub fn mesh(data: MeshData) -> Self {
        Self {
            name: None,
            transform: LocalTransform::identity(),
            content: NodeContent::Mesh(data),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_transform(mut self, transform: LocalTransform) -> Self {
        self.transform = transform;
        self
    }
}

/// Arena of nodes plus the ordered list of top-level nodes.
///
/// Nodes reference children by id, so a malformed scene can contain cycles or
/// shared sub-trees; the flattener rejects both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub nodes: Vec<Node>,
    pub roots: Vec<NodeId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the arena without attaching it anywhere
    pub fn add(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Add a node and make it a top-level node
    pub fn add_root(&mut self, node: Node) -> NodeId {
        let id = self.add(node);
        self.roots.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn from_json(json: &str) -> ExportResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Non-fatal problems found while preparing a scene
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The leaf was exported as empty geometry.
    InvalidGeometry { node: NodeId, reason: String },
    /// The leaf's material had no colour; the default gray was used.
    UnsupportedMaterial { node: NodeId },
}

/// One leaf as sampled from the scene
#[derive(Debug, Clone, PartialEq)]
pub struct LeafRecord {
    pub node: NodeId,
    pub name: String,
    pub vertices_local: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
    pub world: Matrix4<f64>,
    pub material: MaterialSource,
}

impl LeafRecord {
    pub fn is_empty(&self) -> bool {
        self.vertices_local.is_empty() || self.triangles.is_empty()
    }
}

/// Output of a flatten pass
#[derive(Debug, Clone, Default)]
pub struct Flattened {
    pub records: Vec<LeafRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Walks a scene depth-first, pre-order, children in stored order
pub struct SceneFlattener<'a> {
    scene: &'a Scene,
}

impl<'a> SceneFlattener<'a> {
    pub fn new(scene: &'a Scene) -> Self {
        Self { scene }
    }

    /// Produce one record per mesh leaf, in traversal order.
    ///
    /// Leaves with unusable geometry yield an empty record and a diagnostic.
    /// A node reached twice (cycle or shared sub-tree) or a dangling child id
    /// aborts with [`ExportError::InvalidGeometry`].
    pub fn flatten(&self) -> ExportResult<Flattened> {
        let mut out = Flattened::default();
        let mut visited = vec![false; self.scene.nodes.len()];
        let mut stack: Vec<(NodeId, Matrix4<f64>)> = self
            .scene
            .roots
            .iter()
            .rev()
            .map(|&id| (id, Matrix4::identity()))
            .collect();

        while let Some((id, parent_world)) = stack.pop() {
            let node = self.scene.node(id).ok_or_else(|| ExportError::InvalidGeometry {
                node: id,
                reason: "reference to a node that does not exist".to_string(),
            })?;

            if std::mem::replace(&mut visited[id], true) {
                return Err(ExportError::InvalidGeometry {
                    node: id,
                    reason: "node reached twice; scene graph has a cycle or shared sub-tree"
                        .to_string(),
                });
            }

            // Recomputed on every visit, never read from a cache
            let world = Transform::compose(&parent_world, &node.transform);

            match &node.content {
                NodeContent::Group(children) => {
                    stack.extend(children.iter().rev().map(|&child| (child, world)));
                }
                NodeContent::Mesh(data) => {
                    let ordinal = out.records.len() + 1;
                    let name = node
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("Shape_{ordinal}"));

                    let record = match sample_leaf(data) {
                        Ok((vertices_local, triangles)) => LeafRecord {
                            node: id,
                            name,
                            vertices_local,
                            triangles,
                            world,
                            material: data.material,
                        },
                        Err(reason) => {
                            warn!(node = id, %reason, "skipping leaf geometry");
                            out.diagnostics.push(Diagnostic::InvalidGeometry { node: id, reason });
                            LeafRecord {
                                node: id,
                                name,
                                vertices_local: Vec::new(),
                                triangles: Vec::new(),
                                world,
                                material: data.material,
                            }
                        }
                    };

                    debug!(
                        node = id,
                        name = %record.name,
                        vertices = record.vertices_local.len(),
                        triangles = record.triangles.len(),
                        "flattened leaf"
                    );
                    out.records.push(record);
                }
            }
        }

        Ok(out)
    }
}

/// Copy a leaf's streams into owned vertex and triangle lists.
fn sample_leaf(data: &MeshData) -> Result<(Vec<Vertex>, Vec<Triangle>), String> {
    let positions = data
        .positions
        .as_ref()
        .ok_or_else(|| "missing position stream".to_string())?;

    if positions.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let vertex_count = positions.len();
    let triangles: Vec<Triangle> = match &data.indices {
        Some(indices) => {
            if indices.len() % 3 != 0 {
                return Err(format!(
                    "index count {} is not a multiple of three",
                    indices.len()
                ));
            }
            if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(format!(
                    "index {bad} out of range for {vertex_count} vertices"
                ));
            }
            indices.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect()
        }
        None => {
            if vertex_count % 3 != 0 {
                return Err(format!(
                    "non-indexed vertex count {vertex_count} is not a multiple of three"
                ));
            }
            let count = u32::try_from(vertex_count)
                .map_err(|_| format!("{vertex_count} vertices exceed the 32-bit index range"))?;
            (0..count).step_by(3).map(|i| [i, i + 1, i + 2]).collect()
        }
    };

    Ok((positions.clone(), triangles))
}
