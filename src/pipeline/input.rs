//! Input files: name, size, type tag and raw bytes.
//!
//! Inputs are classified once from their MIME-style type tag. Paths read from
//! disk get their tag from the file extension via `mime_guess`; callers that
//! already know the type (an upload handler, say) pass it explicitly.

use crate::error::DecodeError;
use std::path::Path;
use tracing::debug;

/// How the decoder treats a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Any bitmap format the `image` crate may decode.
    Raster,
    /// SVG.
    Vector,
    /// A (possibly multi-page) PDF.
    Pdf,
    /// Anything else. Skipped without error.
    Unsupported,
}

impl InputKind {
    /// Classify a MIME-style type tag.
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        let essence = mime.split(';').next().unwrap_or("").trim();
        if essence == "image/svg+xml" {
            InputKind::Vector
        } else if essence.starts_with("image/") {
            InputKind::Raster
        } else if essence == "application/pdf" {
            InputKind::Pdf
        } else {
            InputKind::Unsupported
        }
    }
}

/// One selected file.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub mime: String,
    pub kind: InputKind,
    pub bytes: Vec<u8>,
}

impl InputFile {
    /// Wrap in-memory bytes with a known type tag.
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        let mime = mime.into();
        Self {
            name: name.into(),
            kind: InputKind::from_mime(&mime),
            mime,
            bytes,
        }
    }

    /// Read a file from disk, guessing its type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| DecodeError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        debug!("Read {} ({} bytes, {})", path.display(), bytes.len(), mime);
        Ok(Self::new(name, mime, bytes))
    }

    /// Size of the file in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// File name without its last extension.
    pub fn stem(&self) -> &str {
        file_stem(&self.name)
    }
}

/// Strip the last `.ext` from a file name.
///
/// A leading dot is part of the name (`.hidden` stays `.hidden`), and a name
/// without a dot is returned unchanged.
pub fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}
