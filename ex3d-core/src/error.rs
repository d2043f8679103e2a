/// Error types for scene export
use thiserror::Error;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Fatal export failures. A failed export never yields partial output.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The scene has no leaf with renderable geometry.
    #[error("scene contains no renderable geometry")]
    EmptyInput,

    /// The scene graph itself is malformed (cycle or shared sub-tree).
    #[error("invalid geometry at node {node}: {reason}")]
    InvalidGeometry {
        /// Index of the offending node.
        node: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// Vertex or triangle count does not fit the 32-bit index width.
    #[error("{count} elements exceed the 32-bit index range")]
    IndexOverflow {
        /// Offending element count.
        count: usize,
    },

    /// Archive assembly or chunk encoding failed.
    #[error("serialization failed: {message}")]
    Serialization {
        /// Description of the failure.
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExportError {
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Whether this failure happened while encoding output bytes.
    pub fn is_serialization(&self) -> bool {
        matches!(
            self,
            Self::Serialization { .. } | Self::Io(_) | Self::Zip(_) | Self::Xml(_) | Self::Json(_)
        )
    }
}

/// Convert a length into a 32-bit index, failing on overflow.
pub fn index_u32(count: usize) -> ExportResult<u32> {
    u32::try_from(count).map_err(|_| ExportError::IndexOverflow { count })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_u32_bounds() {
        assert_eq!(index_u32(7).unwrap(), 7);
        assert!(matches!(
            index_u32(u32::MAX as usize + 1),
            Err(ExportError::IndexOverflow { .. })
        ));
    }

    #[test]
    fn test_serialization_classification() {
        assert!(ExportError::serialization("boom").is_serialization());
        assert!(!ExportError::EmptyInput.is_serialization());
    }
}
