//! Decoding: turn each [`InputFile`] into zero or more [`RasterPage`]s.
//!
//! Decoding never fails a batch. A file that cannot be decoded yields no
//! pages, is logged and counted, and the remaining files carry on. Only the
//! orchestrator decides whether an empty result is an error.
//!
//! Files decode concurrently; [`decode_files`] flattens the results back into
//! selection order so the page sequence always matches what the user picked,
//! with every PDF expanded in place in ascending page order.

use crate::config::ConversionConfig;
use crate::error::DecodeError;
use crate::pipeline::encode::{preview_data_uri, svg_data_uri};
use crate::pipeline::input::{file_stem, InputFile, InputKind};
use futures::future::join_all;
use image::{DynamicImage, GenericImageView};
use resvg::usvg;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Decoded pixels of one page.
pub enum PixelSource {
    /// A bitmap at its natural resolution.
    Bitmap(DynamicImage),
    /// A parsed SVG, rendered only when painted.
    Vector(Box<usvg::Tree>),
}

impl std::fmt::Debug for PixelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelSource::Bitmap(img) => write!(f, "Bitmap({}x{})", img.width(), img.height()),
            PixelSource::Vector(tree) => write!(
                f,
                "Vector({}x{})",
                tree.size().width(),
                tree.size().height()
            ),
        }
    }
}

/// One decoded unit of input content: an image, or one PDF page.
#[derive(Debug)]
pub struct RasterPage {
    /// Original file name, or `<stem>-page-<n>` for PDF pages.
    pub source_name: String,
    /// Base name for archive entries: the file name without its extension,
    /// or the whole `source_name` for PDF pages.
    pub stem: String,
    /// File size, or file size ÷ page count for PDF pages. Display only.
    pub approximate_size: u64,
    pub pixel_source: PixelSource,
    /// Data URI showing the same content, independent of `pixel_source`.
    pub preview: String,
    pub natural_width: u32,
    pub natural_height: u32,
}

impl RasterPage {
    /// Wrap an already decoded bitmap.
    pub fn from_image(
        source_name: impl Into<String>,
        approximate_size: u64,
        image: DynamicImage,
    ) -> Result<Self, DecodeError> {
        let (natural_width, natural_height) = image.dimensions();
        if natural_width == 0 || natural_height == 0 {
            return Err(DecodeError::Empty);
        }
        let preview = preview_data_uri(&image)?;
        let source_name = source_name.into();
        Ok(Self {
            stem: file_stem(&source_name).to_string(),
            source_name,
            approximate_size,
            pixel_source: PixelSource::Bitmap(image),
            preview,
            natural_width,
            natural_height,
        })
    }

    /// Parse SVG bytes into a vector page.
    pub fn from_svg(source_name: impl Into<String>, bytes: &[u8]) -> Result<Self, DecodeError> {
        let tree = usvg::Tree::from_data(bytes, &svg_options())
            .map_err(|e| DecodeError::Svg(e.to_string()))?;
        let size = tree.size();
        let natural_width = size.width().ceil() as u32;
        let natural_height = size.height().ceil() as u32;
        if natural_width == 0 || natural_height == 0 {
            return Err(DecodeError::Empty);
        }
        let source_name = source_name.into();
        Ok(Self {
            stem: file_stem(&source_name).to_string(),
            source_name,
            approximate_size: bytes.len() as u64,
            pixel_source: PixelSource::Vector(Box::new(tree)),
            preview: svg_data_uri(bytes),
            natural_width,
            natural_height,
        })
    }

    /// True only for scalable vector inputs; drives supersampling.
    pub fn is_vector(&self) -> bool {
        matches!(self.pixel_source, PixelSource::Vector(_))
    }
}

/// SVG parse options sharing one lazily loaded system font database.
fn svg_options() -> usvg::Options<'static> {
    static FONTS: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    let fonts = FONTS.get_or_init(|| {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        debug!("Loaded {} system font faces for SVG text", db.len());
        Arc::new(db)
    });
    usvg::Options {
        fontdb: Arc::clone(fonts),
        ..usvg::Options::default()
    }
}

/// Pages decoded from a whole selection, in selection order.
#[derive(Debug, Default)]
pub struct DecodeOutcome {
    pub pages: Vec<RasterPage>,
    /// Files in the selection.
    pub files: usize,
    /// Unsupported files, skipped silently.
    pub skipped: usize,
    /// Files that yielded no pages because decoding failed.
    pub failed: usize,
}

enum FileOutcome {
    Decoded(Vec<RasterPage>),
    Skipped,
    Failed,
}

/// Decode a single file.
///
/// Unsupported files decode to no pages without error.
pub async fn decode_file(
    file: InputFile,
    config: &ConversionConfig,
) -> Result<Vec<RasterPage>, DecodeError> {
    match file.kind {
        InputKind::Raster => {
            let page = spawn_decode(move || {
                let size = file.size();
                let image = image::load_from_memory(&file.bytes)?;
                RasterPage::from_image(file.name, size, image)
            })
            .await?;
            Ok(vec![page])
        }
        InputKind::Vector => {
            let max = config.max_surface_edge;
            let page = spawn_decode(move || RasterPage::from_svg(file.name, &file.bytes)).await?;
            if page.natural_width.max(page.natural_height) > max {
                return Err(DecodeError::TooLarge {
                    width: page.natural_width,
                    height: page.natural_height,
                    max,
                });
            }
            Ok(vec![page])
        }
        InputKind::Pdf => decode_pdf(file, config).await,
        InputKind::Unsupported => Ok(Vec::new()),
    }
}

async fn spawn_decode<T, F>(f: F) -> Result<T, DecodeError>
where
    F: FnOnce() -> Result<T, DecodeError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DecodeError::Task(e.to_string()))?
}

/// Render every page of a PDF and label the results.
async fn decode_pdf(
    file: InputFile,
    config: &ConversionConfig,
) -> Result<Vec<RasterPage>, DecodeError> {
    let rasterizer = config.resolve_pdf_rasterizer();
    let scale = config.pdf_render_scale;
    let stem = file.stem().to_string();
    let size = file.size();

    spawn_decode(move || {
        let mut rendered = rasterizer.rasterize(&file.bytes, scale)?;
        if rendered.is_empty() {
            return Err(DecodeError::Empty);
        }
        rendered.sort_by_key(|(idx, _)| *idx);

        let per_page = size / rendered.len() as u64;
        rendered
            .into_iter()
            .map(|(idx, image)| -> Result<RasterPage, DecodeError> {
                let label = format!("{}-page-{}", stem, idx + 1);
                let mut page = RasterPage::from_image(label.clone(), per_page, image)?;
                page.stem = label;
                Ok(page)
            })
            .collect()
    })
    .await
}

/// Decode a whole selection.
///
/// Never fails: unsupported files are skipped, undecodable files are
/// dropped with a warning. The returned pages are in selection order.
pub async fn decode_files(files: Vec<InputFile>, config: &ConversionConfig) -> DecodeOutcome {
    let total = files.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_decode_start(total);
    }

    let results = join_all(files.into_iter().map(|file| async move {
        if file.kind == InputKind::Unsupported {
            debug!("Skipping unsupported file '{}' ({})", file.name, file.mime);
            return FileOutcome::Skipped;
        }
        let name = file.name.clone();
        match decode_file(file, config).await {
            Ok(pages) => {
                debug!("Decoded '{}' → {} page(s)", name, pages.len());
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_decoded(&name, pages.len());
                }
                FileOutcome::Decoded(pages)
            }
            Err(e) => {
                warn!("Dropping '{}': {}", name, e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_failed(&name, &e.to_string());
                }
                FileOutcome::Failed
            }
        }
    }))
    .await;

    let mut outcome = DecodeOutcome {
        files: total,
        ..DecodeOutcome::default()
    };
    for result in results {
        match result {
            FileOutcome::Decoded(pages) => outcome.pages.extend(pages),
            FileOutcome::Skipped => outcome.skipped += 1,
            FileOutcome::Failed => outcome.failed += 1,
        }
    }

    info!(
        "Decoded {} file(s) into {} page(s) ({} skipped, {} failed)",
        total,
        outcome.pages.len(),
        outcome.skipped,
        outcome.failed
    );
    outcome
}
