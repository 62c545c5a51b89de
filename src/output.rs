//! Output types: the single artifact a run produces, plus its statistics.

use serde::{Deserialize, Serialize};

/// Which container a [`ConversionOutput`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerKind {
    /// A multi-page PDF.
    Document,
    /// A ZIP archive of images.
    Archive,
}

impl ContainerKind {
    /// Default download name for this container.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            ContainerKind::Document => "converted-files.pdf",
            ContainerKind::Archive => "converted-images.zip",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ContainerKind::Document => "application/pdf",
            ContainerKind::Archive => "application/zip",
        }
    }
}

/// The result of one successful run.
///
/// Only ever constructed after every page has been encoded; a failed run
/// yields an error and no `ConversionOutput` at all.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub kind: ContainerKind,
    pub bytes: Vec<u8>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Byte length of the container.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn file_name(&self) -> &'static str {
        self.kind.default_file_name()
    }

    pub fn mime_type(&self) -> &'static str {
        self.kind.mime_type()
    }
}

/// Counters and timings for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Files in the selection.
    pub input_files: usize,
    /// Files skipped because their type is unsupported.
    pub skipped_files: usize,
    /// Files dropped because they failed to decode.
    pub failed_files: usize,
    /// Pages written to the output.
    pub pages: usize,
    /// Size of the output container.
    pub output_bytes: usize,
    pub decode_duration_ms: u64,
    pub encode_duration_ms: u64,
    pub total_duration_ms: u64,
}
