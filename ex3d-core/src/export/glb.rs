/// Binary glTF (GLB) writer: one mesh and node per leaf, one material per colour
use std::collections::BTreeMap;

use gltf_json as json;
use json::validation::Checked::Valid;
use json::validation::USize64;
use tracing::debug;

use crate::error::{index_u32, ExportError, ExportResult};
use crate::export::{ExportFormat, MeshExporter};
use crate::geometry::LeafMesh;
use crate::prepare::PreparedScene;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

/// Packs binary data with 4-byte alignment and tracks views and accessors
#[derive(Debug, Default)]
struct BufferBuilder {
    data: Vec<u8>,
    views: Vec<json::buffer::View>,
    accessors: Vec<json::Accessor>,
}

impl BufferBuilder {
    fn push_view(
        &mut self,
        bytes: &[u8],
        target: json::buffer::Target,
    ) -> ExportResult<json::Index<json::buffer::View>> {
        align_buffer(&mut self.data, 0);
        self.views.push(json::buffer::View {
            buffer: json::Index::new(0),
            byte_length: USize64::from(bytes.len()),
            byte_offset: Some(USize64::from(self.data.len())),
            byte_stride: None,
            name: None,
            target: Some(Valid(target)),
            extensions: Default::default(),
            extras: Default::default(),
        });
        self.data.extend_from_slice(bytes);
        Ok(json::Index::new(index_u32(self.views.len() - 1)?))
    }

    fn push_accessor(&mut self, accessor: json::Accessor) -> ExportResult<json::Index<json::Accessor>> {
        self.accessors.push(accessor);
        Ok(json::Index::new(index_u32(self.accessors.len() - 1)?))
    }

    fn positions(&mut self, leaf: &LeafMesh) -> ExportResult<json::Index<json::Accessor>> {
        let mut bytes = Vec::with_capacity(leaf.vertices.len() * 12);
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];

        for v in &leaf.vertices {
            let p = [v.x as f32, v.y as f32, v.z as f32];
            for (axis, value) in p.into_iter().enumerate() {
                min[axis] = min[axis].min(value);
                max[axis] = max[axis].max(value);
                bytes.extend_from_slice(&value.to_le_bytes());
            }
        }

        let view = self.push_view(&bytes, json::buffer::Target::ArrayBuffer)?;
        self.push_accessor(json::Accessor {
            buffer_view: Some(view),
            byte_offset: None,
            count: USize64::from(leaf.vertices.len()),
            component_type: Valid(json::accessor::GenericComponentType(
                json::accessor::ComponentType::F32,
            )),
            type_: Valid(json::accessor::Type::Vec3),
            min: Some(serde_json::Value::from(min.to_vec())),
            max: Some(serde_json::Value::from(max.to_vec())),
            name: None,
            normalized: false,
            sparse: None,
            extensions: Default::default(),
            extras: Default::default(),
        })
    }

    fn indices(&mut self, leaf: &LeafMesh) -> ExportResult<json::Index<json::Accessor>> {
        let mut bytes = Vec::with_capacity(leaf.triangles.len() * 12);
        for index in leaf.triangles.iter().flatten() {
            bytes.extend_from_slice(&index.to_le_bytes());
        }

        let view = self.push_view(&bytes, json::buffer::Target::ElementArrayBuffer)?;
        self.push_accessor(json::Accessor {
            buffer_view: Some(view),
            byte_offset: None,
            count: USize64::from(leaf.triangles.len() * 3),
            component_type: Valid(json::accessor::GenericComponentType(
                json::accessor::ComponentType::U32,
            )),
            type_: Valid(json::accessor::Type::Scalar),
            min: None,
            max: None,
            name: None,
            normalized: false,
            sparse: None,
            extensions: Default::default(),
            extras: Default::default(),
        })
    }
}

/// Pad `buffer` with `fill` up to the next multiple of four bytes
pub fn align_buffer(buffer: &mut Vec<u8>, fill: u8) {
    while buffer.len() % 4 != 0 {
        buffer.push(fill);
    }
}

/// Writes the scene as GLB, leaves kept separate
#[derive(Debug, Clone)]
pub struct GlbExporter {
    generator: String,
}

impl GlbExporter {
    pub fn new(generator: impl Into<String>) -> Self {
        Self {
            generator: generator.into(),
        }
    }

    /// Build the glTF document and its binary buffer
    fn document(&self, scene: &PreparedScene) -> ExportResult<(json::Root, Vec<u8>)> {
        let mut root = json::Root {
            asset: json::Asset {
                version: "2.0".to_string(),
                generator: Some(self.generator.clone()),
                ..Default::default()
            },
            ..Default::default()
        };

        let materials: Vec<json::Index<json::Material>> = scene
            .materials
            .materials()
            .iter()
            .map(|m| {
                let [r, g, b] = m.color.to_linear();
                root.push(json::Material {
                    name: Some(m.name.clone()),
                    double_sided: true,
                    pbr_metallic_roughness: json::material::PbrMetallicRoughness {
                        base_color_factor: json::material::PbrBaseColorFactor([r, g, b, 1.0]),
                        metallic_factor: json::material::StrengthFactor(0.0),
                        roughness_factor: json::material::StrengthFactor(1.0),
                        ..Default::default()
                    },
                    ..Default::default()
                })
            })
            .collect();

        let mut buffer = BufferBuilder::default();
        let mut nodes = Vec::new();
        for leaf in scene.non_empty_leaves() {
            let positions = buffer.positions(leaf)?;
            let indices = buffer.indices(leaf)?;
            let material = materials.get(leaf.material_id).copied().ok_or_else(|| {
                ExportError::serialization(format!(
                    "leaf {} references unknown material {}",
                    leaf.name, leaf.material_id
                ))
            })?;

            let primitive = json::mesh::Primitive {
                attributes: BTreeMap::from([(Valid(json::mesh::Semantic::Positions), positions)]),
                indices: Some(indices),
                material: Some(material),
                mode: Valid(json::mesh::Mode::Triangles),
                targets: None,
                extensions: Default::default(),
                extras: Default::default(),
            };
            let mesh = root.push(json::Mesh {
                name: Some(leaf.name.clone()),
                primitives: vec![primitive],
                weights: None,
                extensions: Default::default(),
                extras: Default::default(),
            });
            nodes.push(root.push(json::Node {
                name: Some(leaf.name.clone()),
                mesh: Some(mesh),
                ..Default::default()
            }));
        }

        align_buffer(&mut buffer.data, 0);
        root.push(json::Buffer {
            byte_length: USize64::from(buffer.data.len()),
            name: None,
            uri: None,
            extensions: Default::default(),
            extras: Default::default(),
        });
        root.buffer_views = buffer.views;
        root.accessors = buffer.accessors;

        let scene_index = root.push(json::Scene {
            name: None,
            nodes,
            extensions: Default::default(),
            extras: Default::default(),
        });
        root.scene = Some(scene_index);

        Ok((root, buffer.data))
    }
}

impl MeshExporter for GlbExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Glb
    }

    fn write(&self, scene: &PreparedScene) -> ExportResult<Vec<u8>> {
        scene.ensure_not_empty()?;

        let (root, bin) = self.document(scene)?;
        let json = serde_json::to_vec(&root)?;
        let bytes = assemble_glb(&json, &bin)?;
        debug!(
            nodes = root.nodes.len(),
            materials = root.materials.len(),
            bytes = bytes.len(),
            "wrote GLB"
        );
        Ok(bytes)
    }
}

/// Frame a JSON chunk and a binary chunk into a GLB container
pub fn assemble_glb(json: &[u8], bin: &[u8]) -> ExportResult<Vec<u8>> {
    let mut json_chunk = json.to_vec();
    align_buffer(&mut json_chunk, b' ');
    let mut bin_chunk = bin.to_vec();
    align_buffer(&mut bin_chunk, 0);

    let total = 12 + 8 + json_chunk.len() + 8 + bin_chunk.len();
    let chunk_len = |len: usize| {
        u32::try_from(len).map_err(|_| ExportError::serialization("GLB chunk exceeds 4 GiB"))
    };

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(GLB_MAGIC);
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&chunk_len(total)?.to_le_bytes());

    out.extend_from_slice(&chunk_len(json_chunk.len())?.to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json_chunk);

    out.extend_from_slice(&chunk_len(bin_chunk.len())?.to_le_bytes());
    out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    out.extend_from_slice(&bin_chunk);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::MeshData;
    use crate::material::{MaterialSource, Rgb};
    use crate::scene::{Node, Scene};

    fn read_u32(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    fn export(scene: &Scene) -> Vec<u8> {
        let prepared = PreparedScene::from_scene(scene).unwrap();
        GlbExporter::new("test").write(&prepared).unwrap()
    }

    #[test]
    fn test_glb_framing() {
        let mut scene = Scene::new();
        scene.add_root(Node::mesh(MeshData::square(2.0)));
        let bytes = export(&scene);

        assert_eq!(&bytes[0..4], b"glTF");
        assert_eq!(read_u32(&bytes, 4), 2);
        assert_eq!(read_u32(&bytes, 8) as usize, bytes.len());

        let json_len = read_u32(&bytes, 12) as usize;
        assert_eq!(json_len % 4, 0);
        assert_eq!(read_u32(&bytes, 16), CHUNK_JSON);

        let bin_header = 20 + json_len;
        let bin_len = read_u32(&bytes, bin_header) as usize;
        assert_eq!(bin_len % 4, 0);
        assert_eq!(read_u32(&bytes, bin_header + 4), CHUNK_BIN);
        assert_eq!(bin_header + 8 + bin_len, bytes.len());
        // 4 positions * 12 bytes + 6 indices * 4 bytes
        assert_eq!(bin_len, 48 + 24);
    }

    #[test]
    fn test_glb_one_node_per_leaf_shared_material() {
        let orange = MaterialSource::HasColor(Rgb::new(255, 165, 0));
        let mut scene = Scene::new();
        scene.add_root(Node::mesh(MeshData::square(1.0).with_material(orange)).with_name("A"));
        scene.add_root(Node::mesh(MeshData::default()));
        scene.add_root(Node::mesh(MeshData::square(1.0).with_material(orange)).with_name("B"));
        let bytes = export(&scene);

        let json_len = read_u32(&bytes, 12) as usize;
        let doc: serde_json::Value = serde_json::from_slice(&bytes[20..20 + json_len]).unwrap();

        assert_eq!(doc["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(doc["nodes"][1]["name"], "B");
        assert_eq!(doc["meshes"][0]["primitives"][0]["material"], 0);
        assert_eq!(doc["meshes"][1]["primitives"][0]["material"], 0);
        assert_eq!(doc["accessors"][0]["max"][0], 1.0);
        assert_eq!(doc["bufferViews"][1]["target"], 34963);
        assert_eq!(doc["accessors"][1]["componentType"], 5125);
    }

    #[test]
    fn test_glb_empty_scene() {
        let prepared = PreparedScene::from_scene(&Scene::new()).unwrap();
        assert!(matches!(
            GlbExporter::new("test").write(&prepared),
            Err(ExportError::EmptyInput)
        ));
    }
}
