/// Terminal front-end: export scenes and inspect mesh files
use clap::{Args, Parser, Subcommand};
use ex3d_core::import::{parse_binary_stl, parse_obj};
use ex3d_core::{
    export_scene, ExportFormat, ExportOptions, ExportOutput, FeatureLevel, LocalTransform,
    MaterialSource, MergedMesh, MeshData, Node, Rgb, Scene,
};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod report;

pub use report::Report;

#[derive(Debug, Parser)]
#[command(name = "ex3d", version, about = "Export extruded scenes to STL, OBJ, GLB and 3MF")]
pub struct Cli {
    /// Log every leaf and archive entry
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Export a scene description (or the demo scene) to a file
    Export(ExportArgs),
    /// Print vertex and triangle counts of an STL or OBJ file
    Inspect {
        file: PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// JSON scene description; the built-in demo scene is used when omitted
    #[arg(long)]
    pub scene: Option<PathBuf>,

    #[arg(short, long)]
    pub output: PathBuf,

    /// stl, obj, glb or 3mf; inferred from the output extension when omitted
    #[arg(short, long)]
    pub format: Option<ExportFormat>,

    /// JSON file with export options
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the minimal 3MF layout instead of the slicer-compatible one
    #[arg(long)]
    pub minimal: bool,

    /// Extrusion depth of the demo shapes, in mm
    #[arg(long, default_value_t = 5.0)]
    pub depth: f64,

    /// Overall width of the demo scene, in mm
    #[arg(long, default_value_t = 60.0)]
    pub size: f64,
}

fn invalid_data(context: &str, err: impl std::fmt::Display) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, format!("{context}: {err}"))
}

/// Three extruded shapes in two colours, laid out along X within `size` mm
pub fn demo_scene(depth: f64, size: f64) -> Scene {
    let orange = MaterialSource::HasColor(Rgb::new(0xFF, 0xA5, 0x00));
    let teal = MaterialSource::HasColor(Rgb::new(0x00, 0x80, 0x80));
    let cell = size / 3.0;
    let radius = cell * 0.45;

    let mut scene = Scene::new();
    let hexagon = scene.add(
        Node::mesh(MeshData::prism(&MeshData::regular_outline(6, radius), depth).with_material(teal))
            .with_name("Hexagon"),
    );
    let triangle = scene.add(
        Node::mesh(MeshData::prism(&MeshData::regular_outline(3, radius), depth).with_material(orange))
            .with_name("Triangle")
            .with_transform(LocalTransform::from_translation(cell, 0.0, 0.0)),
    );
    let square = scene.add(
        Node::mesh(MeshData::prism(&MeshData::regular_outline(4, radius), depth).with_material(orange))
            .with_name("Square")
            .with_transform(LocalTransform::from_translation(2.0 * cell, 0.0, 0.0)),
    );
    scene.add_root(
        Node::group(vec![hexagon, triangle, square])
            .with_name("Demo")
            .with_transform(LocalTransform::from_translation(cell / 2.0, cell / 2.0, 0.0)),
    );
    scene
}

/// Resolve options from the config file and flags
pub fn load_options(args: &ExportArgs) -> io::Result<ExportOptions> {
    let mut options = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            ExportOptions::from_json(&json).map_err(|e| invalid_data("invalid config", e))?
        }
        None => ExportOptions::default(),
    };
    if args.minimal {
        options.feature_level = FeatureLevel::Minimal;
    }
    Ok(options)
}

pub fn run_export(args: &ExportArgs) -> io::Result<ExportOutput> {
    let options = load_options(args)?;

    let scene = match &args.scene {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            Scene::from_json(&json).map_err(|e| invalid_data("invalid scene", e))?
        }
        None => demo_scene(args.depth, args.size),
    };

    let format = match args.format {
        Some(format) => format,
        None => ExportFormat::from_path(&args.output).ok_or_else(|| {
            invalid_data("cannot infer format", args.output.display())
        })?,
    };
    debug!(%format, output = %args.output.display(), "exporting");

    let output = export_scene(&scene, format, &options)
        .map_err(|e| io::Error::new(ErrorKind::Other, format!("export failed: {e}")))?;
    fs::write(&args.output, &output.bytes)?;
    Ok(output)
}

pub fn inspect(path: &Path) -> io::Result<MergedMesh> {
    let data = fs::read(path)?;
    match ExportFormat::from_path(path) {
        Some(ExportFormat::Stl) => {
            parse_binary_stl(&data).map_err(|e| invalid_data("failed to parse STL", e))
        }
        Some(ExportFormat::Obj) => {
            let text = String::from_utf8(data).map_err(|e| invalid_data("OBJ is not UTF-8", e))?;
            parse_obj(&text).map_err(|e| invalid_data("failed to parse OBJ", e))
        }
        _ => Err(io::Error::new(
            ErrorKind::Unsupported,
            format!("inspect supports .stl and .obj, got {}", path.display()),
        )),
    }
}
