//! # rasterpack
//!
//! Batch-convert images and PDFs into one downloadable artifact: a single
//! multi-page PDF, or a ZIP archive of re-encoded images.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files
//!  │
//!  ├─ 1. Decode     images, SVGs, every PDF page → RasterPage (bad files dropped)
//!  ├─ 2. Rasterize  paint onto an opaque white surface (SVGs supersampled)
//!  ├─ 3. Encode     JPEG / PNG / WebP / BMP, or a JPEG snapshot per PDF page
//!  └─ 4. Package    one PDF document or one ZIP archive + stats
//! ```
//!
//! Decoding is tolerant: an undecodable file is logged and skipped. Encoding
//! is all-or-nothing: one failed page fails the run and no artifact is
//! produced.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rasterpack::{convert_paths, ConversionConfig, RasterFormat, TargetFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .target(TargetFormat::Image(RasterFormat::WebP))
//!         .quality(0.8)
//!         .build()?;
//!     let output = convert_paths(["scan.pdf", "photo.png"], &config).await?;
//!     std::fs::write(output.file_name(), &output.bytes)?;
//!     eprintln!("{} pages, {} bytes", output.stats.pages, output.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `rasterpack` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! rasterpack = { version = "0.1", default-features = false }
//! ```
//!
//! ## PDF inputs
//!
//! PDF pages are rendered with pdfium, bound at runtime. Point
//! `PDFIUM_LIB_PATH` (or [`ConversionConfigBuilder::pdfium_library_path`]) at
//! the library, or install it system-wide. Without it PDF files fail to
//! decode and are skipped like any other bad file.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, ImageFilters, Orientation, PageLayout, PaperSize,
    RasterFormat, TargetFormat,
};
pub use convert::{convert, convert_files, convert_paths, convert_sync, convert_to_file};
pub use error::{ConvertError, DecodeError, EncodeError};
pub use output::{ContainerKind, ConversionOutput, ConversionStats};
pub use pipeline::decode::{decode_files, DecodeOutcome, RasterPage};
pub use pipeline::input::{InputFile, InputKind};
pub use pipeline::render::{PdfRasterizer, PdfiumRasterizer};
pub use progress::{
    percent_complete, ConversionProgressCallback, NoopProgressCallback, ProgressCallback,
};
