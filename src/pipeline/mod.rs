//! Pipeline stages for batch image conversion.
//!
//! Each submodule implements one transformation step, so each can be tested
//! on its own and the PDF engine can be swapped without touching the rest.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ decode ──▶ rasterize ──▶ encode ──▶ document | archive
//! (bytes)   (pages)    (surface)     (bytes)    (PDF)      (ZIP)
//!              │
//!              └── render (pdfium, PDF inputs only)
//! ```
//!
//! 1. [`input`]    : classify each file by its type tag
//! 2. [`decode`]   : images, SVGs and PDF pages become [`decode::RasterPage`]s;
//!    bad files are dropped, never fatal
//! 3. [`render`]   : rasterise PDF pages; blocking, behind a trait
//! 4. [`rasterize`]: paint a page onto an opaque white [`rasterize::Surface`],
//!    running any colour [`filter`]s on the way
//! 5. [`encode`]   : JPEG / PNG / WebP / BMP bytes from a surface
//! 6. [`document`] / [`archive`]: assemble the single output container

pub mod archive;
pub mod decode;
pub mod document;
pub mod encode;
pub mod filter;
pub mod input;
pub mod rasterize;
pub mod render;
