/// Coloured status output for export and inspect results
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use ex3d_core::{Diagnostic, ExportOutput, MergedMesh};
use std::io::Write;

/// Writes human-readable summaries to any terminal-like writer
pub struct Report<W: Write> {
    out: W,
}

impl<W: Write> Report<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, color: Color, label: &str, text: &str) -> std::io::Result<()> {
        self.out.queue(SetForegroundColor(color))?;
        self.out.queue(Print(format!("{label:>10} ")))?;
        self.out.queue(ResetColor)?;
        self.out.queue(Print(format!("{text}\n")))?;
        Ok(())
    }

    /// Warnings for skipped leaves and colour fallbacks
    pub fn diagnostics(&mut self, diagnostics: &[Diagnostic]) -> std::io::Result<()> {
        for diagnostic in diagnostics {
            let text = match diagnostic {
                Diagnostic::InvalidGeometry { node, reason } => {
                    format!("node {node}: skipped ({reason})")
                }
                Diagnostic::UnsupportedMaterial { node } => {
                    format!("node {node}: no colour, exported as default gray")
                }
            };
            self.line(Color::Yellow, "warning", &text)?;
        }
        Ok(())
    }

    pub fn exported(&mut self, output: &ExportOutput, path: &str) -> std::io::Result<()> {
        self.line(
            Color::Green,
            "exported",
            &format!(
                "{path} ({}, {} bytes, {} shapes, {} materials)",
                output.format.mime_type(),
                output.bytes.len(),
                output.shape_count,
                output.material_count
            ),
        )?;
        self.out.flush()
    }

    pub fn inspected(&mut self, mesh: &MergedMesh, path: &str) -> std::io::Result<()> {
        self.line(
            Color::Cyan,
            "inspected",
            &format!(
                "{path}: {} vertices, {} triangles",
                mesh.vertices.len(),
                mesh.triangles.len()
            ),
        )?;
        self.out.flush()
    }

    pub fn failed(&mut self, message: &str) -> std::io::Result<()> {
        self.line(Color::Red, "error", message)?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ex3d_core::ExportFormat;

    #[test]
    fn test_exported_line() {
        let output = ExportOutput {
            format: ExportFormat::Stl,
            bytes: vec![0; 184],
            shape_count: 2,
            material_count: 1,
            diagnostics: Vec::new(),
        };
        let mut report = Report::new(Vec::new());
        report.exported(&output, "out.stl").unwrap();
        let text = String::from_utf8(report.into_inner()).unwrap();
        assert!(text.contains("exported"));
        assert!(text.contains("out.stl (model/stl, 184 bytes, 2 shapes, 1 materials)"));
    }

    #[test]
    fn test_diagnostic_lines() {
        let diagnostics = vec![
            Diagnostic::InvalidGeometry {
                node: 3,
                reason: "missing position stream".to_string(),
            },
            Diagnostic::UnsupportedMaterial { node: 4 },
        ];
        let mut report = Report::new(Vec::new());
        report.diagnostics(&diagnostics).unwrap();
        let text = String::from_utf8(report.into_inner()).unwrap();
        assert!(text.contains("node 3: skipped (missing position stream)"));
        assert!(text.contains("node 4: no colour"));
    }
}
