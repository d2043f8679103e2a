//! EX3D Core Library - Scene flattening and mesh export
//!
//! This library turns a hierarchical scene of extruded shapes into STL, OBJ,
//! GLB and 3MF blobs. It is stateless: every export call builds its own
//! flattened leaves, material table and output buffers.

pub mod config;
pub mod error;
pub mod export;
pub mod format;
pub mod geometry;
pub mod import;
pub mod material;
pub mod prepare;
pub mod scene;
pub mod transform;

// Re-export commonly used types
pub use config::{ExportOptions, FeatureLevel, PrinterProfile};
pub use error::{ExportError, ExportResult};
pub use export::{export_scene, export_with, exporter_for, ExportFormat, ExportOutput, MeshExporter};
pub use geometry::{LeafMesh, MeshData, Triangle, Vertex};
pub use material::{Material, MaterialRegistry, MaterialSource, Rgb};
pub use prepare::{MergedMesh, PreparedScene};
pub use scene::{Diagnostic, Node, NodeContent, NodeId, Scene, SceneFlattener};
pub use transform::{LocalTransform, RotationState, Transform};
