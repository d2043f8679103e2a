/// Export options and the printer profile written into slicer projects
use serde::{Deserialize, Serialize};

use crate::error::ExportResult;

/// Which packaged manufacturing layout to emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureLevel {
    /// Single model part with a `<basematerials>` block.
    Minimal,
    /// Component objects, per-part extruder metadata and project settings.
    #[default]
    SlicerCompatible,
}

/// Fixed printer and process defaults for slicer projects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterProfile {
    /// Bed width in mm.
    pub bed_width: f64,
    /// Bed depth in mm.
    pub bed_depth: f64,
    pub print_height: f64,
    pub nozzle_diameter: f64,
    pub layer_height: f64,
    pub filament_type: String,
    /// Filament colour entries are padded up to this count (never below two).
    pub min_filament_slots: usize,
}

impl Default for PrinterProfile {
    fn default() -> Self {
        Self {
            bed_width: 180.0,
            bed_depth: 180.0,
            print_height: 180.0,
            nozzle_diameter: 0.4,
            layer_height: 0.2,
            filament_type: "PLA".to_string(),
            min_filament_slots: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Free text for the 80-byte binary mesh header; truncated to fit.
    pub stl_header: String,
    pub feature_level: FeatureLevel,
    pub printer: PrinterProfile,
    /// Application name recorded in generated documents.
    pub generator: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            stl_header: "Binary STL exported by ex3d".to_string(),
            feature_level: FeatureLevel::SlicerCompatible,
            printer: PrinterProfile::default(),
            generator: format!("ex3d {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ExportOptions {
    /// Parse options from JSON, any missing field taking its default
    pub fn from_json(json: &str) -> ExportResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let profile = PrinterProfile::default();
        assert_eq!(profile.bed_width, 180.0);
        assert_eq!(profile.bed_depth, 180.0);
        assert_eq!(profile.print_height, 180.0);
        assert_eq!(profile.nozzle_diameter, 0.4);
        assert_eq!(profile.layer_height, 0.2);
        assert_eq!(profile.min_filament_slots, 2);
    }

    #[test]
    fn test_partial_json_overrides() {
        let options =
            ExportOptions::from_json(r#"{"feature_level": "minimal", "printer": {"layer_height": 0.12}}"#)
                .unwrap();
        assert_eq!(options.feature_level, FeatureLevel::Minimal);
        assert_eq!(options.printer.layer_height, 0.12);
        assert_eq!(options.printer.nozzle_diameter, 0.4);
    }
}
