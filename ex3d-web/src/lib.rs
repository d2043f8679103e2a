/// EX3D Web - WASM bindings for in-browser scene export
///
/// The page hands over a JSON scene description and gets the encoded file
/// back as bytes, together with a summary shaped like the conversion
/// endpoint's response.

use ex3d_core::{export_scene, ExportFormat, ExportOptions, ExportOutput, Scene};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Response summary for one export
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub success: bool,
    pub format: String,
    pub mime_type: String,
    pub size: usize,
    pub shape_count: usize,
    pub warnings: usize,
}

impl From<&ExportOutput> for ExportSummary {
    fn from(output: &ExportOutput) -> Self {
        Self {
            success: true,
            format: output.format.extension().to_string(),
            mime_type: output.format.mime_type().to_string(),
            size: output.bytes.len(),
            shape_count: output.shape_count,
            warnings: output.diagnostics.len(),
        }
    }
}

/// The outcome of one export: file bytes plus the JSON summary
#[wasm_bindgen]
#[derive(Debug)]
pub struct ExportedFile {
    bytes: Vec<u8>,
    summary: String,
}

#[wasm_bindgen]
impl ExportedFile {
    /// Encoded file contents
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// JSON summary: success, format, mimeType, size, shapeCount, warnings
    pub fn summary(&self) -> String {
        self.summary.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Exporter bound to one set of options; every call returns its own result
#[wasm_bindgen]
pub struct WebExporter {
    options: ExportOptions,
}

#[wasm_bindgen]
impl WebExporter {
    /// Create an exporter, optionally from a JSON options document
    #[wasm_bindgen(constructor)]
    pub fn new(options_json: Option<String>) -> Result<WebExporter, JsValue> {
        let options = match options_json {
            Some(json) => ExportOptions::from_json(&json).map_err(to_js)?,
            None => ExportOptions::default(),
        };
        Ok(WebExporter { options })
    }

    /// Export a JSON scene to `format` (stl, obj, glb or 3mf)
    pub fn export(&self, scene_json: &str, format: &str) -> Result<ExportedFile, JsValue> {
        export_file(scene_json, format, &self.options).map_err(|message| {
            web_sys::console::error_1(&JsValue::from_str(&message));
            JsValue::from_str(&message)
        })
    }
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Platform-independent part of [`WebExporter::export`]
pub fn export_file(
    scene_json: &str,
    format: &str,
    options: &ExportOptions,
) -> Result<ExportedFile, String> {
    let output = export_bytes(scene_json, format, options)?;
    let summary = serde_json::to_string(&ExportSummary::from(&output)).map_err(|e| e.to_string())?;
    Ok(ExportedFile {
        bytes: output.bytes,
        summary,
    })
}

/// Parse the scene and format name, then export
pub fn export_bytes(
    scene_json: &str,
    format: &str,
    options: &ExportOptions,
) -> Result<ExportOutput, String> {
    let format: ExportFormat = format.parse()?;
    let scene = Scene::from_json(scene_json).map_err(|e| e.to_string())?;
    export_scene(&scene, format, options).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r##"{
        "nodes": [
            {"name": "tri", "content": {"mesh": {
                "positions": [[0,0,0],[1,0,0],[0,1,0]],
                "indices": [0,1,2],
                "material": {"has_color": "#FFA500"}
            }}}
        ],
        "roots": [0]
    }"##;

    #[test]
    fn test_export_bytes_summary() {
        let output = export_bytes(SCENE, "stl", &ExportOptions::default()).unwrap();
        let summary = ExportSummary::from(&output);
        assert!(summary.success);
        assert_eq!(summary.size, 84 + 50);
        assert_eq!(summary.shape_count, 1);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["shapeCount"], 1);
        assert_eq!(json["mimeType"], "model/stl");
    }

    #[test]
    fn test_each_call_owns_its_summary() {
        let options = ExportOptions::default();
        let stl = export_file(SCENE, "stl", &options).unwrap();
        let glb = export_file(SCENE, "glb", &options).unwrap();
        assert!(export_file("{", "stl", &options).is_err());

        let stl_summary: serde_json::Value = serde_json::from_str(&stl.summary()).unwrap();
        assert_eq!(stl_summary["size"], 134);
        assert_eq!(stl.bytes().len(), 134);

        let glb_summary: serde_json::Value = serde_json::from_str(&glb.summary()).unwrap();
        assert_eq!(glb_summary["format"], "glb");
        assert_eq!(glb_summary["size"], glb.size());
    }

    #[test]
    fn test_export_bytes_errors() {
        assert!(export_bytes(SCENE, "ply", &ExportOptions::default()).is_err());
        assert!(export_bytes("{", "stl", &ExportOptions::default()).is_err());
        let empty = r#"{"nodes": [], "roots": []}"#;
        let err = export_bytes(empty, "3mf", &ExportOptions::default()).unwrap_err();
        assert!(err.contains("no renderable geometry"));
    }
}
