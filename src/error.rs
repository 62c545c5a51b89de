//! Error types for the rasterpack library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`DecodeError`] (**non-fatal**): one input file could not be turned
//!   into pages (corrupt image, unreadable PDF, missing pdfium). The file is
//!   dropped, counted, and the batch continues.
//!
//! * [`EncodeError`]: a single page could not be re-encoded or inserted into
//!   its container. Always wrapped into [`ConvertError::EncodeFailed`] by the
//!   orchestrator: one bad page aborts the whole run.
//!
//! * [`ConvertError`] (**fatal**): the run produces no output at all.
//!
//! Callers showing errors to end users should use
//! [`ConvertError::user_message`], which collapses every fatal error into one
//! of two fixed messages and never exposes internal detail.

use std::path::PathBuf;
use thiserror::Error;

/// User-facing message for a selection that yielded no pages.
pub const EMPTY_RESULT_MESSAGE: &str = "No valid image or PDF files were selected.";

/// User-facing message for every other fatal failure.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred during conversion.";

/// All fatal errors returned by the rasterpack library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// `convert` was called with an empty page sequence.
    #[error("Nothing to convert: the page list is empty")]
    NothingToConvert,

    /// Every selected file was unsupported or failed to decode.
    #[error("No valid image or PDF files were selected ({skipped} skipped, {failed} failed to decode)")]
    NoValidInput { skipped: usize, failed: usize },

    // ── Encode errors ─────────────────────────────────────────────────────
    /// A page could not be rasterised, encoded or inserted.
    #[error("Encoding failed for page {index} ('{name}'): {source}")]
    EncodeFailed {
        index: usize,
        name: String,
        #[source]
        source: EncodeError,
    },

    /// The paginated document could not be serialised.
    #[error("Failed to write PDF document: {0}")]
    DocumentWriteFailed(String),

    /// The archive could not be finalised.
    #[error("Failed to finalise ZIP archive: {0}")]
    ArchiveWriteFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a blocking task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// True when the run failed because there was nothing usable to convert.
    pub fn is_empty_result(&self) -> bool {
        matches!(
            self,
            ConvertError::NothingToConvert | ConvertError::NoValidInput { .. }
        )
    }

    /// The message to show an end user.
    ///
    /// Only two messages exist: the empty-result message and a generic
    /// conversion failure. Use the `Display` impl for logs.
    pub fn user_message(&self) -> &'static str {
        if self.is_empty_result() {
            EMPTY_RESULT_MESSAGE
        } else {
            UNEXPECTED_ERROR_MESSAGE
        }
    }
}

/// A non-fatal error for a single input file.
///
/// The decoder logs it, reports it through the progress callback and drops
/// the file; the rest of the batch is unaffected.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The file could not be read from disk.
    #[error("could not read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Raster image bytes are not decodable.
    #[error("could not decode image: {0}")]
    Image(#[from] image::ImageError),

    /// SVG bytes are not parseable.
    #[error("could not parse SVG: {0}")]
    Svg(String),

    /// pdfium rejected the document or one of its pages.
    #[error("could not render PDF: {0}")]
    Pdf(String),

    /// No pdfium library could be bound.
    #[error("pdfium library unavailable: {0}")]
    PdfiumUnavailable(String),

    /// A vector source whose natural size exceeds the surface limit.
    #[error("{width}x{height} exceeds the {max} px surface limit")]
    TooLarge { width: u32, height: u32, max: u32 },

    /// The file decoded but has no drawable content.
    #[error("file has no drawable content")]
    Empty,

    /// The blocking decode task died.
    #[error("decode task failed: {0}")]
    Task(String),
}

/// A failure while encoding one page or inserting it into a container.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The image codec rejected the surface.
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// The drawing surface is over the size limit or could not be allocated.
    #[error("could not allocate a {width}x{height} surface")]
    Surface { width: u32, height: u32 },

    /// The encoder finished without producing any bytes.
    #[error("encoder produced no data")]
    EmptyOutput,

    /// The archive writer rejected the entry.
    #[error("archive insert failed: {0}")]
    Archive(String),

    /// The format cannot hold an image this large.
    #[error("{format} cannot encode a {width}x{height} image")]
    Dimensions {
        format: &'static str,
        width: u32,
        height: u32,
    },

    /// libwebp rejected the surface.
    #[error("WebP encoding failed: {0}")]
    WebP(String),

    /// The blocking encode task died.
    #[error("encode task failed: {0}")]
    Task(String),
}
