//! Scene exporters.
//!
//! Every exporter consumes a [`PreparedScene`] built fresh for the call and
//! returns the complete output blob, or an error and no output at all:
//! - **STL**: binary, all leaves merged, no materials
//! - **OBJ**: text, all leaves merged, no materials
//! - **GLB**: binary glTF, one node per leaf with a base-colour material
//! - **3MF**: zip package, minimal or slicer-compatible (see [`threemf`])
//!
//! Exporters hold configuration only, so one value can serve any number of calls.

pub mod glb;
pub mod obj;
pub mod package;
pub mod stl;
pub mod threemf;
mod xml;

pub use glb::GlbExporter;
pub use obj::ObjExporter;
pub use package::ContainerPackager;
pub use stl::StlExporter;
pub use threemf::ThreeMfExporter;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::info;

use crate::config::ExportOptions;
use crate::error::ExportResult;
use crate::prepare::PreparedScene;
use crate::scene::{Diagnostic, Scene};

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Stl,
    Obj,
    Glb,
    ThreeMf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [Self::Stl, Self::Obj, Self::Glb, Self::ThreeMf];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Stl => "stl",
            Self::Obj => "obj",
            Self::Glb => "glb",
            Self::ThreeMf => "3mf",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Stl => "model/stl",
            Self::Obj => "model/obj",
            Self::Glb => "model/gltf-binary",
            Self::ThreeMf => "model/3mf",
        }
    }

    /// Determine format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()?.to_str()?.parse().ok()
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stl" => Ok(Self::Stl),
            "obj" => Ok(Self::Obj),
            "glb" | "gltf" => Ok(Self::Glb),
            "3mf" => Ok(Self::ThreeMf),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

/// A serializer from a prepared scene to one output format
pub trait MeshExporter {
    fn format(&self) -> ExportFormat;

    /// Encode the whole scene. Fails with `EmptyInput` on a scene without geometry.
    fn write(&self, scene: &PreparedScene) -> ExportResult<Vec<u8>>;
}

/// Build the exporter for `format`, configured from `options`
pub fn exporter_for(format: ExportFormat, options: &ExportOptions) -> Box<dyn MeshExporter> {
    match format {
        ExportFormat::Stl => Box::new(StlExporter::new(options.stl_header.clone())),
        ExportFormat::Obj => Box::new(ObjExporter),
        ExportFormat::Glb => Box::new(GlbExporter::new(options.generator.clone())),
        ExportFormat::ThreeMf => Box::new(ThreeMfExporter::new(
            options.feature_level,
            options.printer.clone(),
            options.generator.clone(),
        )),
    }
}

/// Result of a completed export
#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
    /// Number of leaves that contributed geometry.
    pub shape_count: usize,
    pub material_count: usize,
    /// Leaves that were skipped or recoloured along the way.
    pub diagnostics: Vec<Diagnostic>,
}

/// Flatten, transform and deduplicate `scene`, then encode it with `exporter`
pub fn export_with(scene: &Scene, exporter: &dyn MeshExporter) -> ExportResult<ExportOutput> {
    let prepared = PreparedScene::from_scene(scene)?;
    let bytes = exporter.write(&prepared)?;

    let output = ExportOutput {
        format: exporter.format(),
        bytes,
        shape_count: prepared.leaves.len(),
        material_count: prepared.materials.len(),
        diagnostics: prepared.diagnostics,
    };
    info!(
        format = %output.format,
        shapes = output.shape_count,
        bytes = output.bytes.len(),
        "export complete"
    );
    Ok(output)
}

/// Export `scene` to `format` with the given options
pub fn export_scene(
    scene: &Scene,
    format: ExportFormat,
    options: &ExportOptions,
) -> ExportResult<ExportOutput> {
    export_with(scene, exporter_for(format, options).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;
    use crate::geometry::MeshData;
    use crate::scene::Node;

    #[test]
    fn test_format_parsing() {
        assert_eq!("3MF".parse::<ExportFormat>().unwrap(), ExportFormat::ThreeMf);
        assert_eq!(ExportFormat::from_path(Path::new("out.glb")), Some(ExportFormat::Glb));
        assert_eq!(ExportFormat::from_path(Path::new("out.txt")), None);
        assert!("ply".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_every_format_rejects_empty_scene() {
        let options = ExportOptions::default();
        let mut scene = Scene::new();
        scene.add_root(Node::mesh(MeshData::default()));

        for format in ExportFormat::ALL {
            let result = export_scene(&scene, format, &options);
            assert!(matches!(result, Err(ExportError::EmptyInput)), "{format}");
        }
    }

    #[test]
    fn test_exporter_is_reusable() {
        let options = ExportOptions::default();
        let exporter = exporter_for(ExportFormat::Stl, &options);

        let mut one = Scene::new();
        one.add_root(Node::mesh(MeshData::square(1.0)));
        let mut two = one.clone();
        two.add_root(Node::mesh(MeshData::square(2.0)));

        assert_eq!(export_with(&one, exporter.as_ref()).unwrap().bytes.len(), 84 + 2 * 50);
        assert_eq!(export_with(&two, exporter.as_ref()).unwrap().bytes.len(), 84 + 4 * 50);
        assert_eq!(export_with(&one, exporter.as_ref()).unwrap().bytes.len(), 84 + 2 * 50);
    }
}
