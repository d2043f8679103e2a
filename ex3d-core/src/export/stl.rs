/// Binary STL writer for the merged scene mesh
use tracing::debug;

use crate::error::{index_u32, ExportResult};
use crate::export::{ExportFormat, MeshExporter};
use crate::prepare::{MergedMesh, PreparedScene};

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;

/// Writes all leaves as one materialless binary STL
#[derive(Debug, Clone, Default)]
pub struct StlExporter {
    header: String,
}

impl StlExporter {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }
}

impl MeshExporter for StlExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Stl
    }

    fn write(&self, scene: &PreparedScene) -> ExportResult<Vec<u8>> {
        scene.ensure_not_empty()?;
        let merged = scene.merged()?;
        let bytes = write_binary_stl(&merged, &self.header)?;
        debug!(triangles = merged.triangles.len(), bytes = bytes.len(), "wrote binary STL");
        Ok(bytes)
    }
}

/// Encode a merged mesh: 80-byte header, u32 count, 50 bytes per triangle.
///
/// Facet normals are written as zeros; consumers recompute them from winding.
pub fn write_binary_stl(mesh: &MergedMesh, header: &str) -> ExportResult<Vec<u8>> {
    let triangle_count = index_u32(mesh.triangles.len())?;
    let mut out = Vec::with_capacity(HEADER_LEN + 4 + mesh.triangles.len() * TRIANGLE_LEN);

    let mut header_buf = [0u8; HEADER_LEN];
    let len = header.len().min(HEADER_LEN);
    header_buf[..len].copy_from_slice(&header.as_bytes()[..len]);
    out.extend_from_slice(&header_buf);

    out.extend_from_slice(&triangle_count.to_le_bytes());

    for triangle in &mesh.triangles {
        out.extend_from_slice(&[0u8; 12]);
        for &index in triangle {
            let v = &mesh.vertices[index as usize];
            for coord in [v.x, v.y, v.z] {
                out.extend_from_slice(&(coord as f32).to_le_bytes());
            }
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn single_triangle() -> MergedMesh {
        MergedMesh {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            triangles: vec![[0, 1, 2]],
        }
    }

    #[test]
    fn test_stl_size() {
        let bytes = write_binary_stl(&single_triangle(), "").unwrap();
        assert_eq!(bytes.len(), 84 + 50);
        assert_eq!(u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]), 1);
    }

    #[test]
    fn test_stl_header_is_truncated() {
        let header = "x".repeat(200);
        let bytes = write_binary_stl(&MergedMesh::default(), &header).unwrap();
        assert_eq!(bytes.len(), 84);
        assert!(bytes[..80].iter().all(|&b| b == b'x'));
    }

    #[test]
    fn test_stl_normal_and_attribute_are_zero() {
        let bytes = write_binary_stl(&single_triangle(), "hdr").unwrap();
        assert!(bytes[84..96].iter().all(|&b| b == 0));
        assert_eq!(&bytes[132..134], &[0, 0]);
        // second vertex x
        assert_eq!(f32::from_le_bytes([bytes[108], bytes[109], bytes[110], bytes[111]]), 1.0);
    }
}
