//! 3MF (3D Manufacturing Format) export.
//!
//! A 3MF file is a zip archive of XML parts. Two layouts are produced from the
//! same prepared scene, selected by [`FeatureLevel`]:
//!
//! - **Minimal**: `[Content_Types].xml`, `_rels/.rels`, `3D/3dmodel.model` with
//!   one `<object>` per leaf and a `<basematerials>` colour table, and an empty
//!   `3D/_rels/3dmodel.model.rels`.
//! - **Slicer-compatible**: the root model holds a single assembly object whose
//!   `<components>` point into `3D/Objects/object_1.model` through the
//!   production extension. `Metadata/model_settings.config` gives every part
//!   its name and extruder, and `Metadata/project_settings.config` lists one
//!   filament colour per material alongside the printer profile.
//!
//! Vertex coordinates are written with 7 decimals (6 for the minimal layout).

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{FeatureLevel, PrinterProfile};
use crate::error::ExportResult;
use crate::export::package::ContainerPackager;
use crate::export::xml::XmlDoc;
use crate::export::{ExportFormat, MeshExporter};
use crate::format::{counter_uuid, fixed, IDENTITY_3X4, IDENTITY_4X4};
use crate::geometry::LeafMesh;
use crate::prepare::PreparedScene;

pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";
pub const ROOT_RELS_PATH: &str = "_rels/.rels";
pub const MODEL_PATH: &str = "3D/3dmodel.model";
pub const MODEL_RELS_PATH: &str = "3D/_rels/3dmodel.model.rels";
pub const OBJECT_MODEL_PATH: &str = "3D/Objects/object_1.model";
pub const MODEL_SETTINGS_PATH: &str = "Metadata/model_settings.config";
pub const PROJECT_SETTINGS_PATH: &str = "Metadata/project_settings.config";

const NAMESPACE_CORE: &str = "http://schemas.microsoft.com/3dmanufacturing/core/2015/02";
const NAMESPACE_PRODUCTION: &str =
    "http://schemas.microsoft.com/3dmanufacturing/production/2015/06";
const NAMESPACE_VENDOR: &str = "http://schemas.bambulab.com/package/2021";
const NAMESPACE_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const NAMESPACE_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_TYPE_MODEL: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel";

const CONTENT_TYPE_RELS: &str = "application/vnd.openxmlformats-package.relationships+xml";
const CONTENT_TYPE_MODEL: &str = "application/vnd.ms-package.3dmanufacturing-3dmodel+xml";
const CONTENT_TYPE_PNG: &str = "image/png";
const CONTENT_TYPE_GCODE: &str = "text/x.gcode";

const OBJECT_UUID_SUFFIX: &str = "-61cb-4c03-9d28-80fed5dfa1dc";
const COMPONENT_UUID_SUFFIX: &str = "-b206-40ff-9872-83e8017abed1";
const BUILD_UUID_SUFFIX: &str = "-b1ec-4553-aec9-835e5b724bb4";
const BUILD_UUID: &str = "2c7c17d8-22b5-4d84-8835-1976022ea369";

const SLICER_DECIMALS: usize = 7;
const MINIMAL_DECIMALS: usize = 6;

/// Writes the scene as a 3MF package
#[derive(Debug, Clone)]
pub struct ThreeMfExporter {
    level: FeatureLevel,
    printer: PrinterProfile,
    generator: String,
}

impl ThreeMfExporter {
    pub fn new(level: FeatureLevel, printer: PrinterProfile, generator: impl Into<String>) -> Self {
        Self {
            level,
            printer,
            generator: generator.into(),
        }
    }

    pub fn level(&self) -> FeatureLevel {
        self.level
    }

    /// Build the package entries without compressing them
    pub fn package(&self, scene: &PreparedScene) -> ExportResult<ContainerPackager> {
        scene.ensure_not_empty()?;
        match self.level {
            FeatureLevel::Minimal => self.minimal_package(scene),
            FeatureLevel::SlicerCompatible => self.slicer_package(scene),
        }
    }

    fn minimal_package(&self, scene: &PreparedScene) -> ExportResult<ContainerPackager> {
        let mut package = ContainerPackager::new();
        package.add(CONTENT_TYPES_PATH, content_types_xml(false)?)?;
        package.add(ROOT_RELS_PATH, relationships_xml(&[("rel-1", "/3D/3dmodel.model")])?)?;
        package.add(MODEL_PATH, self.minimal_model_xml(scene)?)?;
        package.add(MODEL_RELS_PATH, relationships_xml(&[])?)?;
        Ok(package)
    }

    fn slicer_package(&self, scene: &PreparedScene) -> ExportResult<ContainerPackager> {
        let mut package = ContainerPackager::new();
        package.add(CONTENT_TYPES_PATH, content_types_xml(true)?)?;
        package.add(ROOT_RELS_PATH, relationships_xml(&[("rel-1", "/3D/3dmodel.model")])?)?;
        package.add(MODEL_PATH, self.assembly_model_xml(scene)?)?;
        package.add(
            MODEL_RELS_PATH,
            relationships_xml(&[("rel-1", &format!("/{OBJECT_MODEL_PATH}"))])?,
        )?;
        package.add(OBJECT_MODEL_PATH, parts_model_xml(scene)?)?;
        package.add(MODEL_SETTINGS_PATH, model_settings_xml(scene)?)?;
        package.add(PROJECT_SETTINGS_PATH, self.project_settings_json(scene)?)?;
        Ok(package)
    }

    /// Single model part: basematerials id 1, leaf objects from id 2.
    fn minimal_model_xml(&self, scene: &PreparedScene) -> ExportResult<String> {
        let mut doc = XmlDoc::new()?;
        doc.open(
            "model",
            &[
                ("unit", "millimeter"),
                ("xml:lang", "en-US"),
                ("xmlns", NAMESPACE_CORE),
            ],
        )?;
        doc.text("metadata", &[("name", "Application")], &self.generator)?;

        doc.open("resources", &[])?;
        doc.open("basematerials", &[("id", "1")])?;
        for material in scene.materials.materials() {
            doc.empty(
                "base",
                &[("name", &material.name), ("displaycolor", &material.color.to_hex())],
            )?;
        }
        doc.close("basematerials")?;

        for (i, leaf) in scene.non_empty_leaves().enumerate() {
            let id = (i + 2).to_string();
            let pindex = leaf.material_id.to_string();
            doc.open(
                "object",
                &[
                    ("id", &id),
                    ("name", &leaf.name),
                    ("type", "model"),
                    ("pid", "1"),
                    ("pindex", &pindex),
                ],
            )?;
            write_mesh(&mut doc, leaf, MINIMAL_DECIMALS)?;
            doc.close("object")?;
        }
        doc.close("resources")?;

        doc.open("build", &[])?;
        for i in 0..scene.non_empty_leaves().count() {
            let id = (i + 2).to_string();
            doc.empty("item", &[("objectid", &id), ("transform", IDENTITY_3X4)])?;
        }
        doc.close("build")?;
        doc.close("model")?;
        doc.finish()
    }

    /// Root model: one assembly object whose components are the leaf parts.
    fn assembly_model_xml(&self, scene: &PreparedScene) -> ExportResult<String> {
        let part_count = scene.non_empty_leaves().count();
        let assembly_id = assembly_object_id(part_count);
        let component_path = format!("/{OBJECT_MODEL_PATH}");

        let mut doc = XmlDoc::new()?;
        open_slicer_model(&mut doc)?;
        doc.text("metadata", &[("name", "Application")], &self.generator)?;
        doc.text("metadata", &[("name", "BambuStudio:3mfVersion")], "1")?;

        doc.open("resources", &[])?;
        doc.open(
            "object",
            &[
                ("id", &assembly_id.to_string()),
                ("p:UUID", &counter_uuid(assembly_id, OBJECT_UUID_SUFFIX)),
                ("type", "model"),
            ],
        )?;
        doc.open("components", &[])?;
        for part_id in 1..=part_count {
            doc.empty(
                "component",
                &[
                    ("p:path", &component_path),
                    ("objectid", &part_id.to_string()),
                    ("p:UUID", &counter_uuid(part_id, COMPONENT_UUID_SUFFIX)),
                    ("transform", IDENTITY_3X4),
                ],
            )?;
        }
        doc.close("components")?;
        doc.close("object")?;
        doc.close("resources")?;

        doc.open("build", &[("p:UUID", BUILD_UUID)])?;
        doc.empty(
            "item",
            &[
                ("objectid", &assembly_id.to_string()),
                ("p:UUID", &counter_uuid(1, BUILD_UUID_SUFFIX)),
                ("transform", IDENTITY_3X4),
                ("printable", "1"),
            ],
        )?;
        doc.close("build")?;
        doc.close("model")?;
        doc.finish()
    }

    fn project_settings_json(&self, scene: &PreparedScene) -> ExportResult<String> {
        let settings = ProjectSettings::new(scene, &self.printer);
        Ok(serde_json::to_string_pretty(&settings)?)
    }
}

impl MeshExporter for ThreeMfExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::ThreeMf
    }

    fn write(&self, scene: &PreparedScene) -> ExportResult<Vec<u8>> {
        let package = self.package(scene)?;
        debug!(entries = ?package.paths().collect::<Vec<_>>(), "assembling 3MF package");
        let bytes = package.finish()?;
        info!(
            level = ?self.level,
            parts = scene.non_empty_leaves().count(),
            materials = scene.materials.len(),
            bytes = bytes.len(),
            "wrote 3MF"
        );
        Ok(bytes)
    }
}

/// Part objects take ids 1..=n; the assembly follows them.
fn assembly_object_id(part_count: usize) -> usize {
    part_count + 1
}

fn open_slicer_model(doc: &mut XmlDoc) -> ExportResult<()> {
    doc.open(
        "model",
        &[
            ("unit", "millimeter"),
            ("xml:lang", "en-US"),
            ("xmlns", NAMESPACE_CORE),
            ("xmlns:BambuStudio", NAMESPACE_VENDOR),
            ("xmlns:p", NAMESPACE_PRODUCTION),
            ("requiredextensions", "p"),
        ],
    )
}

/// Every leaf as its own mesh object, referenced by the assembly's components.
fn parts_model_xml(scene: &PreparedScene) -> ExportResult<String> {
    let mut doc = XmlDoc::new()?;
    open_slicer_model(&mut doc)?;
    doc.text("metadata", &[("name", "BambuStudio:3mfVersion")], "1")?;

    doc.open("resources", &[])?;
    for (i, leaf) in scene.non_empty_leaves().enumerate() {
        let part_id = i + 1;
        doc.open(
            "object",
            &[
                ("id", &part_id.to_string()),
                ("p:UUID", &counter_uuid(part_id, OBJECT_UUID_SUFFIX)),
                ("type", "model"),
            ],
        )?;
        write_mesh(&mut doc, leaf, SLICER_DECIMALS)?;
        doc.close("object")?;
    }
    doc.close("resources")?;
    doc.empty("build", &[])?;
    doc.close("model")?;
    doc.finish()
}

fn write_mesh(doc: &mut XmlDoc, leaf: &LeafMesh, decimals: usize) -> ExportResult<()> {
    doc.open("mesh", &[])?;

    doc.open("vertices", &[])?;
    for v in &leaf.vertices {
        let (x, y, z) = (fixed(v.x, decimals), fixed(v.y, decimals), fixed(v.z, decimals));
        doc.empty("vertex", &[("x", &x), ("y", &y), ("z", &z)])?;
    }
    doc.close("vertices")?;

    doc.open("triangles", &[])?;
    for [a, b, c] in &leaf.triangles {
        let (v1, v2, v3) = (a.to_string(), b.to_string(), c.to_string());
        doc.empty("triangle", &[("v1", &v1), ("v2", &v2), ("v3", &v3)])?;
    }
    doc.close("triangles")?;

    doc.close("mesh")
}

fn content_types_xml(with_attachments: bool) -> ExportResult<String> {
    let mut doc = XmlDoc::new()?;
    doc.open("Types", &[("xmlns", NAMESPACE_CONTENT_TYPES)])?;
    doc.empty("Default", &[("Extension", "rels"), ("ContentType", CONTENT_TYPE_RELS)])?;
    doc.empty("Default", &[("Extension", "model"), ("ContentType", CONTENT_TYPE_MODEL)])?;
    if with_attachments {
        doc.empty("Default", &[("Extension", "png"), ("ContentType", CONTENT_TYPE_PNG)])?;
        doc.empty("Default", &[("Extension", "gcode"), ("ContentType", CONTENT_TYPE_GCODE)])?;
    }
    doc.close("Types")?;
    doc.finish()
}

fn relationships_xml(targets: &[(&str, &str)]) -> ExportResult<String> {
    let mut doc = XmlDoc::new()?;
    doc.open("Relationships", &[("xmlns", NAMESPACE_RELATIONSHIPS)])?;
    for (id, target) in targets {
        doc.empty(
            "Relationship",
            &[("Target", target), ("Id", id), ("Type", REL_TYPE_MODEL)],
        )?;
    }
    doc.close("Relationships")?;
    doc.finish()
}

/// Per-object and per-part slicer metadata
fn model_settings_xml(scene: &PreparedScene) -> ExportResult<String> {
    let part_count = scene.non_empty_leaves().count();
    let assembly_id = assembly_object_id(part_count).to_string();

    let mut doc = XmlDoc::new()?;
    doc.open("config", &[])?;

    doc.open("object", &[("id", &assembly_id)])?;
    let object_name = match scene.leaves.as_slice() {
        [only] => only.name.clone(),
        _ => "Assembly".to_string(),
    };
    doc.empty("metadata", &[("key", "name"), ("value", &object_name)])?;
    doc.empty("metadata", &[("key", "extruder"), ("value", "1")])?;

    for (i, leaf) in scene.non_empty_leaves().enumerate() {
        let extruder = scene
            .materials
            .get(leaf.material_id)
            .map_or(1, |m| m.extruder)
            .to_string();
        doc.open("part", &[("id", &(i + 1).to_string()), ("subtype", "normal_part")])?;
        doc.empty("metadata", &[("key", "name"), ("value", &leaf.name)])?;
        doc.empty("metadata", &[("key", "matrix"), ("value", IDENTITY_4X4)])?;
        doc.empty("metadata", &[("key", "extruder"), ("value", &extruder)])?;
        doc.empty(
            "mesh_stat",
            &[
                ("face_count", &leaf.triangles.len().to_string()),
                ("edges_fixed", "0"),
                ("degenerate_facets", "0"),
                ("facets_removed", "0"),
                ("facets_reversed", "0"),
                ("backwards_edges", "0"),
            ],
        )?;
        doc.close("part")?;
    }
    doc.close("object")?;

    doc.open("plate", &[])?;
    doc.empty("metadata", &[("key", "plater_id"), ("value", "1")])?;
    doc.empty("metadata", &[("key", "plater_name"), ("value", "")])?;
    doc.empty("metadata", &[("key", "locked"), ("value", "false")])?;
    doc.open("model_instance", &[])?;
    doc.empty("metadata", &[("key", "object_id"), ("value", &assembly_id)])?;
    doc.empty("metadata", &[("key", "instance_id"), ("value", "0")])?;
    doc.empty("metadata", &[("key", "identify_id"), ("value", &(part_count + 100).to_string())])?;
    doc.close("model_instance")?;
    doc.close("plate")?;

    doc.open("assemble", &[])?;
    doc.empty(
        "assemble_item",
        &[
            ("object_id", &assembly_id),
            ("instance_id", "0"),
            ("transform", IDENTITY_3X4),
            ("offset", "0 0 0"),
        ],
    )?;
    doc.close("assemble")?;

    doc.close("config")?;
    doc.finish()
}

/// Flat key/value slicer project configuration, stored as JSON
#[derive(Debug, Serialize)]
struct ProjectSettings {
    from: &'static str,
    name: &'static str,
    version: &'static str,
    filament_colour: Vec<String>,
    filament_type: Vec<String>,
    filament_diameter: Vec<String>,
    nozzle_diameter: Vec<String>,
    printable_area: Vec<String>,
    printable_height: String,
    layer_height: String,
    initial_layer_print_height: String,
}

impl ProjectSettings {
    fn new(scene: &PreparedScene, printer: &PrinterProfile) -> Self {
        let colors: Vec<String> = scene
            .materials
            .filament_colors(printer.min_filament_slots)
            .into_iter()
            .map(|c| c.to_hex())
            .collect();
        let slots = colors.len();
        let (w, d) = (decimal(printer.bed_width), decimal(printer.bed_depth));

        Self {
            from: "project",
            name: "project_settings",
            version: "01.08.00.00",
            filament_colour: colors,
            filament_type: vec![printer.filament_type.clone(); slots],
            filament_diameter: vec!["1.75".to_string(); slots],
            nozzle_diameter: vec![decimal(printer.nozzle_diameter)],
            printable_area: vec![
                "0x0".to_string(),
                format!("{w}x0"),
                format!("{w}x{d}"),
                format!("0x{d}"),
            ],
            printable_height: decimal(printer.print_height),
            layer_height: decimal(printer.layer_height),
            initial_layer_print_height: decimal(printer.layer_height),
        }
    }
}

/// Slicer config values: shortest decimal form, no trailing zeros.
fn decimal(value: f64) -> String {
    format!("{value}")
}
