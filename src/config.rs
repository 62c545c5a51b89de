//! Configuration types for batch conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The config is an immutable value
//! handed down the pipeline by reference; nothing in the crate keeps ambient
//! global state.

use crate::error::ConvertError;
use crate::pipeline::render::{PdfRasterizer, PdfiumRasterizer};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Configuration for one conversion run.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use rasterpack::{ConversionConfig, RasterFormat, TargetFormat};
///
/// let config = ConversionConfig::builder()
///     .target(TargetFormat::Image(RasterFormat::WebP))
///     .quality(0.75)
///     .build()
///     .unwrap();
/// assert_eq!(config.quality, 0.75);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Output container and, for archives, the per-image format.
    /// Default: JPEG images in a ZIP archive.
    pub target: TargetFormat,

    /// Encoder quality in `[0.1, 1.0]`. Default: 0.9.
    ///
    /// Only honoured by lossy formats in archive mode. Document mode always
    /// uses [`Self::snapshot_quality`].
    pub quality: f32,

    /// Supersampling factor applied to vector (SVG) sources. Default: 10.
    ///
    /// Bitmaps are always painted at their natural size.
    pub supersample_factor: u32,

    /// Longest surface edge in pixels. Default: 12 000.
    ///
    /// A supersampled 2 000 px SVG would otherwise need a 20 000 px surface.
    /// The effective factor is lowered until both edges fit, but never below 1.
    pub max_surface_edge: u32,

    /// Logical scale PDF pages are rendered at, 1.5–2.0. Default: 2.0.
    pub pdf_render_scale: f32,

    /// JPEG quality of the page snapshots embedded in document mode. Default: 0.95.
    pub snapshot_quality: f32,

    /// Colour adjustments applied to every page as it is drawn.
    /// Default: none.
    pub filters: ImageFilters,

    /// Page geometry for document mode.
    pub layout: PageLayout,

    /// DEFLATE level for archive entries, 0–9. Default: 6.
    pub compression_level: i64,

    /// Archive-mode pages encoded at once. Default: available parallelism.
    ///
    /// Each in-flight page owns a private surface, so this bounds peak memory
    /// as well as CPU use.
    pub concurrency: usize,

    /// Explicit pdfium shared library to bind.
    ///
    /// If None, `PDFIUM_LIB_PATH` is consulted, then the system library.
    pub pdfium_library_path: Option<PathBuf>,

    /// Pre-constructed PDF renderer. Takes precedence over `pdfium_library_path`.
    pub pdf_rasterizer: Option<Arc<dyn PdfRasterizer>>,

    /// Optional progress sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            target: TargetFormat::default(),
            quality: 0.9,
            supersample_factor: 10,
            max_surface_edge: 12_000,
            pdf_render_scale: 2.0,
            snapshot_quality: 0.95,
            filters: ImageFilters::default(),
            layout: PageLayout::default(),
            compression_level: 6,
            concurrency: default_concurrency(),
            pdfium_library_path: None,
            pdf_rasterizer: None,
            progress_callback: None,
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("target", &self.target)
            .field("quality", &self.quality)
            .field("supersample_factor", &self.supersample_factor)
            .field("max_surface_edge", &self.max_surface_edge)
            .field("pdf_render_scale", &self.pdf_render_scale)
            .field("snapshot_quality", &self.snapshot_quality)
            .field("filters", &self.filters)
            .field("layout", &self.layout)
            .field("compression_level", &self.compression_level)
            .field("concurrency", &self.concurrency)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field(
                "pdf_rasterizer",
                &self.pdf_rasterizer.as_ref().map(|_| "<dyn PdfRasterizer>"),
            )
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The PDF renderer for this run: the injected one, else pdfium.
    pub fn resolve_pdf_rasterizer(&self) -> Arc<dyn PdfRasterizer> {
        match self.pdf_rasterizer {
            Some(ref r) => Arc::clone(r),
            None => Arc::new(PdfiumRasterizer::new(self.pdfium_library_path.clone())),
        }
    }

    /// Quality as the 1–100 scale the image codecs expect.
    pub fn quality_percent(&self) -> u8 {
        to_percent(self.quality)
    }

    /// Snapshot quality as the 1–100 scale the image codecs expect.
    pub fn snapshot_quality_percent(&self) -> u8 {
        to_percent(self.snapshot_quality)
    }
}

/// Map a `[0.0, 1.0]` quality onto the codecs' `1..=100` range.
pub(crate) fn to_percent(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn target(mut self, target: TargetFormat) -> Self {
        self.config.target = target;
        self
    }

    pub fn quality(mut self, quality: f32) -> Self {
        self.config.quality = quality.clamp(0.1, 1.0);
        self
    }

    pub fn supersample_factor(mut self, factor: u32) -> Self {
        self.config.supersample_factor = factor.clamp(1, 16);
        self
    }

    pub fn max_surface_edge(mut self, px: u32) -> Self {
        self.config.max_surface_edge = px.max(16);
        self
    }

    pub fn pdf_render_scale(mut self, scale: f32) -> Self {
        self.config.pdf_render_scale = scale.clamp(1.5, 2.0);
        self
    }

    pub fn snapshot_quality(mut self, quality: f32) -> Self {
        self.config.snapshot_quality = quality.clamp(0.1, 1.0);
        self
    }

    pub fn filters(mut self, filters: ImageFilters) -> Self {
        self.config.filters = filters.clamped();
        self
    }

    pub fn layout(mut self, layout: PageLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn paper_size(mut self, paper: PaperSize) -> Self {
        self.config.layout.paper = paper;
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.config.layout.orientation = orientation;
        self
    }

    pub fn margin_pt(mut self, margin: f32) -> Self {
        self.config.layout.margin_pt = margin.max(0.0);
        self
    }

    pub fn compression_level(mut self, level: i64) -> Self {
        self.config.compression_level = level.clamp(0, 9);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn pdf_rasterizer(mut self, rasterizer: Arc<dyn PdfRasterizer>) -> Self {
        self.config.pdf_rasterizer = Some(rasterizer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        if !(0.1..=1.0).contains(&c.quality) {
            return Err(ConvertError::InvalidConfig(format!(
                "quality must be 0.1–1.0, got {}",
                c.quality
            )));
        }
        let (w, h) = c.layout.content_size_pt();
        if w <= 0.0 || h <= 0.0 {
            return Err(ConvertError::InvalidConfig(format!(
                "margin of {}pt leaves no room on a {:?} page",
                c.layout.margin_pt, c.layout.paper
            )));
        }
        if c.concurrency == 0 {
            return Err(ConvertError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which container a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetFormat {
    /// One multi-page PDF.
    Document,
    /// A ZIP archive of images in the given format.
    Image(RasterFormat),
}

impl Default for TargetFormat {
    fn default() -> Self {
        TargetFormat::Image(RasterFormat::Jpeg)
    }
}

impl FromStr for TargetFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(TargetFormat::Document),
            other => other.parse().map(TargetFormat::Image),
        }
    }
}

/// Image formats available in archive mode.
///
/// `Jpeg` and `Jpg` encode identically and differ only in the file extension
/// written into the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RasterFormat {
    Jpeg,
    Jpg,
    Png,
    WebP,
    Bmp,
}

impl RasterFormat {
    /// Extension appended to each entry's stem.
    pub fn extension(&self) -> &'static str {
        match self {
            RasterFormat::Jpeg => "jpeg",
            RasterFormat::Jpg => "jpg",
            RasterFormat::Png => "png",
            RasterFormat::WebP => "webp",
            RasterFormat::Bmp => "bmp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            RasterFormat::Jpeg | RasterFormat::Jpg => "image/jpeg",
            RasterFormat::Png => "image/png",
            RasterFormat::WebP => "image/webp",
            RasterFormat::Bmp => "image/bmp",
        }
    }

    /// Whether [`ConversionConfig::quality`] affects the output.
    pub fn is_lossy(&self) -> bool {
        matches!(
            self,
            RasterFormat::Jpeg | RasterFormat::Jpg | RasterFormat::WebP
        )
    }

    /// The matching `image` crate format, used for decoding round-trips.
    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            RasterFormat::Jpeg | RasterFormat::Jpg => image::ImageFormat::Jpeg,
            RasterFormat::Png => image::ImageFormat::Png,
            RasterFormat::WebP => image::ImageFormat::WebP,
            RasterFormat::Bmp => image::ImageFormat::Bmp,
        }
    }
}

impl FromStr for RasterFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" => Ok(RasterFormat::Jpeg),
            "jpg" => Ok(RasterFormat::Jpg),
            "png" => Ok(RasterFormat::Png),
            "webp" => Ok(RasterFormat::WebP),
            "bmp" => Ok(RasterFormat::Bmp),
            other => Err(ConvertError::InvalidConfig(format!(
                "unknown output format '{other}' (expected pdf, jpeg, jpg, png, webp or bmp)"
            ))),
        }
    }
}

/// Paper sizes for document mode.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PaperSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    /// Custom size in points (1/72 inch).
    Custom { width_pt: f32, height_pt: f32 },
}

impl PaperSize {
    /// Portrait dimensions in points (width, height).
    pub fn dimensions_pt(&self) -> (f32, f32) {
        match self {
            Self::A4 => (595.28, 841.89),
            Self::A3 => (841.89, 1190.55),
            Self::A5 => (419.53, 595.28),
            Self::Letter => (612.0, 792.0),
            Self::Legal => (612.0, 1008.0),
            Self::Custom {
                width_pt,
                height_pt,
            } => (*width_pt, *height_pt),
        }
    }
}

impl FromStr for PaperSize {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a4" => Ok(Self::A4),
            "a3" => Ok(Self::A3),
            "a5" => Ok(Self::A5),
            "letter" => Ok(Self::Letter),
            "legal" => Ok(Self::Legal),
            other => Err(ConvertError::InvalidConfig(format!(
                "unknown paper size '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Page geometry for document mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub paper: PaperSize,
    pub orientation: Orientation,
    /// Blank border kept on every side, in points. Default: 10.
    pub margin_pt: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            paper: PaperSize::A4,
            orientation: Orientation::Portrait,
            margin_pt: 10.0,
        }
    }
}

impl PageLayout {
    /// Page size in points after applying the orientation.
    pub fn page_size_pt(&self) -> (f32, f32) {
        let (w, h) = self.paper.dimensions_pt();
        match self.orientation {
            Orientation::Portrait => (w.min(h), w.max(h)),
            Orientation::Landscape => (w.max(h), w.min(h)),
        }
    }

    /// Page size minus the margin on all four sides.
    pub fn content_size_pt(&self) -> (f32, f32) {
        let (w, h) = self.page_size_pt();
        (w - 2.0 * self.margin_pt, h - 2.0 * self.margin_pt)
    }
}

/// Colour adjustments applied to the drawn page before it meets the white
/// background, in this order.
///
/// The percentage fields are offsets from 100 %: `brightness: -20` draws the
/// page at 80 % brightness. All zero (the default) leaves pixels untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageFilters {
    /// -100..=100
    pub brightness: i32,
    /// -100..=100
    pub contrast: i32,
    /// -100..=100
    pub saturation: i32,
    /// Gaussian blur standard deviation in surface pixels, 0–50.
    pub blur: f32,
    pub sepia: bool,
    pub grayscale: bool,
}

impl ImageFilters {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// The same filters with every field pulled into its valid range.
    pub fn clamped(self) -> Self {
        Self {
            brightness: self.brightness.clamp(-100, 100),
            contrast: self.contrast.clamp(-100, 100),
            saturation: self.saturation.clamp(-100, 100),
            blur: if self.blur.is_finite() {
                self.blur.clamp(0.0, 50.0)
            } else {
                0.0
            },
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_clamps_quality() {
        let c = ConversionConfig::builder().quality(3.0).build().unwrap();
        assert_eq!(c.quality, 1.0);
        let c = ConversionConfig::builder().quality(0.0).build().unwrap();
        assert_eq!(c.quality, 0.1);
    }

    #[test]
    fn builder_rejects_margin_larger_than_page() {
        let err = ConversionConfig::builder()
            .paper_size(PaperSize::A5)
            .margin_pt(400.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }

    #[test]
    fn quality_percent_rounds() {
        let c = ConversionConfig::builder().quality(0.95).build().unwrap();
        assert_eq!(c.quality_percent(), 95);
        assert_eq!(to_percent(0.1), 10);
        assert_eq!(to_percent(0.0), 1);
    }

    #[test]
    fn pdf_render_scale_stays_in_band() {
        let c = ConversionConfig::builder().pdf_render_scale(4.0).build().unwrap();
        assert_eq!(c.pdf_render_scale, 2.0);
        let c = ConversionConfig::builder().pdf_render_scale(1.0).build().unwrap();
        assert_eq!(c.pdf_render_scale, 1.5);
    }

    #[test]
    fn filters_are_clamped() {
        let c = ConversionConfig::builder()
            .filters(ImageFilters {
                brightness: 500,
                contrast: -300,
                blur: f32::NAN,
                sepia: true,
                ..ImageFilters::default()
            })
            .build()
            .unwrap();
        assert_eq!(c.filters.brightness, 100);
        assert_eq!(c.filters.contrast, -100);
        assert_eq!(c.filters.blur, 0.0);
        assert!(c.filters.sepia);
        assert!(!c.filters.is_identity());
        assert!(ConversionConfig::default().filters.is_identity());
    }

    #[test]
    fn target_format_parsing() {
        assert_eq!("pdf".parse::<TargetFormat>().unwrap(), TargetFormat::Document);
        assert_eq!(
            "JPG".parse::<TargetFormat>().unwrap(),
            TargetFormat::Image(RasterFormat::Jpg)
        );
        assert!("gif".parse::<TargetFormat>().is_err());
    }

    #[test]
    fn only_jpeg_and_webp_are_lossy() {
        assert!(RasterFormat::Jpeg.is_lossy());
        assert!(RasterFormat::Jpg.is_lossy());
        assert!(RasterFormat::WebP.is_lossy());
        assert!(!RasterFormat::Png.is_lossy());
        assert!(!RasterFormat::Bmp.is_lossy());
    }

    #[test]
    fn landscape_swaps_page_edges() {
        let layout = PageLayout {
            orientation: Orientation::Landscape,
            ..PageLayout::default()
        };
        let (w, h) = layout.page_size_pt();
        assert!(w > h);
        let (cw, ch) = layout.content_size_pt();
        assert!((w - cw - 20.0).abs() < 1e-3);
        assert!((h - ch - 20.0).abs() < 1e-3);
    }
}
