/// Wavefront OBJ writer for the merged scene mesh
use std::fmt::Write;

use crate::error::{ExportError, ExportResult};
use crate::export::{ExportFormat, MeshExporter};
use crate::format::round_trip;
use crate::prepare::{MergedMesh, PreparedScene};

/// Writes all leaves as one materialless OBJ: `v` lines, then 1-based `f` lines
#[derive(Debug, Clone, Default)]
pub struct ObjExporter;

impl MeshExporter for ObjExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Obj
    }

    fn write(&self, scene: &PreparedScene) -> ExportResult<Vec<u8>> {
        scene.ensure_not_empty()?;
        let merged = scene.merged()?;
        Ok(write_obj(&merged)?.into_bytes())
    }
}

pub fn write_obj(mesh: &MergedMesh) -> ExportResult<String> {
    let mut out = String::with_capacity(mesh.vertices.len() * 32 + mesh.triangles.len() * 24);
    let fmt_err = |e: std::fmt::Error| ExportError::serialization(format!("OBJ formatting: {e}"));

    writeln!(out, "# ex3d OBJ export").map_err(fmt_err)?;
    writeln!(
        out,
        "# Vertices: {}, Triangles: {}",
        mesh.vertices.len(),
        mesh.triangles.len()
    )
    .map_err(fmt_err)?;

    for v in &mesh.vertices {
        writeln!(out, "v {} {} {}", round_trip(v.x), round_trip(v.y), round_trip(v.z))
            .map_err(fmt_err)?;
    }

    for [a, b, c] in &mesh.triangles {
        writeln!(out, "f {} {} {}", a + 1, b + 1, c + 1).map_err(fmt_err)?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_obj_lines() {
        let mesh = MergedMesh {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.5, 0.0, 0.0),
                Point3::new(0.0, -2.25, 0.1),
            ],
            triangles: vec![[0, 1, 2]],
        };
        let text = write_obj(&mesh).unwrap();
        let lines: Vec<_> = text.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(lines, vec!["v 0 0 0", "v 1.5 0 0", "v 0 -2.25 0.1", "f 1 2 3"]);
    }

    #[test]
    fn test_obj_indices_one_based() {
        let mesh = MergedMesh {
            vertices: vec![Point3::origin(); 4],
            triangles: vec![[0, 1, 2], [0, 2, 3]],
        };
        let text = write_obj(&mesh).unwrap();
        for line in text.lines().filter(|l| l.starts_with("f ")) {
            for part in line.split_whitespace().skip(1) {
                let idx: u32 = part.parse().unwrap();
                assert!((1..=4).contains(&idx));
            }
        }
    }
}
