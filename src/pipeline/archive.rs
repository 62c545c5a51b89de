//! Archive container: a DEFLATE-compressed ZIP of encoded images.
//!
//! Entries are named `<stem>.<ext>` after their page. Two pages can share
//! a stem (`a.png` and `a.jpg`, or a PDF page and an image), so a repeated name
//! gets `-2`, `-3`, … before the extension. Entries must be inserted in page
//! order for the suffixes to be deterministic.

use crate::config::RasterFormat;
use crate::error::{ConvertError, EncodeError};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Builds a ZIP archive in memory.
pub struct ArchiveBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    names: HashSet<String>,
}

impl ArchiveBuilder {
    /// `compression_level` is the DEFLATE level, 0–9.
    pub fn new(compression_level: i64) -> Self {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(compression_level.clamp(0, 9)));
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            options,
            names: HashSet::new(),
        }
    }

    /// Add one encoded image as `<stem>.<ext>`. Returns the entry name used.
    pub fn insert(
        &mut self,
        stem: &str,
        format: RasterFormat,
        bytes: &[u8],
    ) -> Result<String, EncodeError> {
        let name = self.unique_name(stem, format.extension());
        self.writer
            .start_file(name.as_str(), self.options)
            .map_err(|e| EncodeError::Archive(e.to_string()))?;
        self.writer
            .write_all(bytes)
            .map_err(|e| EncodeError::Archive(e.to_string()))?;
        debug!("Archived '{}' ({} bytes)", name, bytes.len());
        Ok(name)
    }

    fn unique_name(&mut self, stem: &str, ext: &str) -> String {
        let mut candidate = format!("{stem}.{ext}");
        let mut n = 2;
        while self.names.contains(&candidate) {
            candidate = format!("{stem}-{n}.{ext}");
            n += 1;
        }
        self.names.insert(candidate.clone());
        candidate
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Write the central directory and return the archive bytes.
    pub fn finish(self) -> Result<Vec<u8>, ConvertError> {
        let cursor = self
            .writer
            .finish()
            .map_err(|e| ConvertError::ArchiveWriteFailed(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}
