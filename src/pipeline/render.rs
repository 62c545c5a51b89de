//! PDF rasterisation: render every page of a PDF to a `DynamicImage`.
//!
//! Rendering sits behind the [`PdfRasterizer`] trait so the decoder does not
//! care which engine produced the bitmaps. The default engine is pdfium via
//! `pdfium-render`; callers and tests may inject their own through
//! [`crate::config::ConversionConfigBuilder::pdf_rasterizer`].
//!
//! Implementations are blocking. The decoder calls them from
//! `tokio::task::spawn_blocking`, since pdfium keeps thread-local state and is
//! CPU-bound.

use crate::error::DecodeError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an existing pdfium library (file or directory).
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Renders a PDF held in memory.
pub trait PdfRasterizer: Send + Sync {
    /// Render all pages at `scale` × their nominal size.
    ///
    /// # Returns
    /// `(page_index_0based, image)` pairs. The order is not significant; the
    /// decoder sorts by index.
    fn rasterize(&self, bytes: &[u8], scale: f32)
        -> Result<Vec<(usize, DynamicImage)>, DecodeError>;
}

/// [`PdfRasterizer`] backed by the pdfium C++ library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library_path: Option<PathBuf>,
}

impl PdfiumRasterizer {
    /// Bind to `library_path` when given, else `PDFIUM_LIB_PATH`, else the
    /// system library.
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }

    fn resolved_library_path(&self) -> Option<PathBuf> {
        self.library_path.clone().or_else(|| {
            std::env::var(PDFIUM_LIB_PATH_ENV)
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
        })
    }

    /// Bind a fresh `Pdfium` instance.
    pub fn bind(&self) -> Result<Pdfium, DecodeError> {
        let bindings = match self.resolved_library_path() {
            Some(path) => bind_at(&path),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| DecodeError::PdfiumUnavailable(format!("{e:?}")))?;
        Ok(Pdfium::new(bindings))
    }
}

fn bind_at(path: &Path) -> Result<Box<dyn PdfiumLibraryBindings>, PdfiumError> {
    if path.is_dir() {
        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
    } else {
        Pdfium::bind_to_library(path)
    }
}

impl PdfRasterizer for PdfiumRasterizer {
    fn rasterize(
        &self,
        bytes: &[u8],
        scale: f32,
    ) -> Result<Vec<(usize, DynamicImage)>, DecodeError> {
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| DecodeError::Pdf(format!("{e:?}")))?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);

        let mut results = Vec::with_capacity(total_pages);
        for idx in 0..total_pages {
            let page = pages
                .get(idx as u16)
                .map_err(|e| DecodeError::Pdf(format!("page {}: {e:?}", idx + 1)))?;

            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| DecodeError::Pdf(format!("page {}: {e:?}", idx + 1)))?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            results.push((idx, image));
        }

        Ok(results)
    }
}
