/// Zip container assembly for packaged formats
use std::io::{Cursor, Write};

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{ExportError, ExportResult};

/// Ordered set of archive entries, written out in insertion order.
///
/// Paths are stored verbatim: case and forward slashes are preserved, since
/// package relationships resolve them case-sensitively.
#[derive(Debug, Clone, Default)]
pub struct ContainerPackager {
    entries: Vec<(String, Vec<u8>)>,
}

impl ContainerPackager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an entry. Rejects empty, absolute, backslashed or duplicate paths.
    pub fn add(&mut self, path: &str, content: impl Into<Vec<u8>>) -> ExportResult<()> {
        if path.is_empty() || path.starts_with('/') || path.contains('\\') {
            return Err(ExportError::serialization(format!(
                "invalid archive path {path:?}"
            )));
        }
        if self.contains(path) {
            return Err(ExportError::serialization(format!(
                "duplicate archive path {path:?}"
            )));
        }
        self.entries.push((path.to_string(), content.into()));
        Ok(())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.iter().any(|(p, _)| p == path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }

    /// Compress every entry into one zip blob
    pub fn finish(self) -> ExportResult<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (path, content) in &self.entries {
            zip.start_file(path.as_str(), options)?;
            zip.write_all(content)?;
            debug!(path = %path, bytes = content.len(), "archived entry");
        }

        Ok(zip.finish()?.into_inner())
    }
}
