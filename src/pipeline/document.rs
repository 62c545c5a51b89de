//! Document container: one PDF page per painted surface.
//!
//! Each surface is snapshotted as a high-quality JPEG (the same lossy step a
//! browser canvas snapshot takes), decoded back and embedded as an RGB image
//! XObject. The image is scaled to the largest size that fits inside the page
//! margins with its aspect ratio kept, then centred.

use crate::config::PageLayout;
use crate::error::{ConvertError, EncodeError};
use crate::pipeline::rasterize::Surface;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, warn};

/// Title written into the document metadata.
const DOCUMENT_TITLE: &str = "Converted files";

/// Where an image lands on a page, in points from the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Fit an `img_w`×`img_h` image inside the page minus `margin` on every side.
///
/// The image fills the available width unless that makes it too tall, in
/// which case it fills the available height. Either way it is centred.
pub fn fit_to_page(page_w: f32, page_h: f32, margin: f32, img_w: f32, img_h: f32) -> Placement {
    let box_w = (page_w - 2.0 * margin).max(0.0);
    let box_h = (page_h - 2.0 * margin).max(0.0);
    if img_w <= 0.0 || img_h <= 0.0 {
        return Placement {
            x: margin,
            y: margin,
            width: 0.0,
            height: 0.0,
        };
    }

    let mut width = box_w;
    let mut height = img_h * width / img_w;
    if height > box_h {
        height = box_h;
        width = img_w * height / img_h;
    }

    Placement {
        x: (page_w - width) / 2.0,
        y: (page_h - height) / 2.0,
        width,
        height,
    }
}

fn pt_to_mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

/// Accumulates pages and serialises them into one PDF.
pub struct DocumentBuilder {
    doc: PdfDocument,
    pages: Vec<PdfPage>,
    layout: PageLayout,
    snapshot_quality: u8,
}

impl DocumentBuilder {
    /// `snapshot_quality` is the JPEG quality (1–100) of each page snapshot.
    pub fn new(layout: PageLayout, snapshot_quality: u8) -> Self {
        Self {
            doc: PdfDocument::new(DOCUMENT_TITLE),
            pages: Vec::new(),
            layout,
            snapshot_quality: snapshot_quality.clamp(1, 100),
        }
    }

    /// Append `surface` as a new page. Returns the snapshot size in bytes.
    pub fn add_page(&mut self, surface: &Surface) -> Result<usize, EncodeError> {
        let (w, h) = (surface.width(), surface.height());
        if w == 0 || h == 0 {
            return Err(EncodeError::Surface {
                width: w,
                height: h,
            });
        }

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.snapshot_quality).write_image(
            surface.pixels().as_raw(),
            w,
            h,
            ExtendedColorType::Rgb8,
        )?;
        let snapshot_len = jpeg.len();
        let snapshot = image::load_from_memory(&jpeg)?.to_rgb8();

        let raw = RawImage {
            pixels: RawImageData::U8(snapshot.into_raw()),
            width: w as usize,
            height: h as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };
        let xobject_id = self.doc.add_image(&raw);

        let (page_w, page_h) = self.layout.page_size_pt();
        // At 72 dpi one pixel is one point, so the scale maps pixels to points.
        let placement = fit_to_page(page_w, page_h, self.layout.margin_pt, w as f32, h as f32);
        let scale = placement.width / w as f32;

        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(placement.x)),
                translate_y: Some(Pt(placement.y)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(72.0),
                rotate: None,
            },
        }];
        self.pages
            .push(PdfPage::new(pt_to_mm(page_w), pt_to_mm(page_h), ops));

        debug!(
            "Page {}: {}x{} px placed at ({:.1}, {:.1}) {:.1}x{:.1} pt",
            self.pages.len(),
            w,
            h,
            placement.x,
            placement.y,
            placement.width,
            placement.height
        );
        Ok(snapshot_len)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Serialise the document.
    pub fn finish(mut self) -> Result<Vec<u8>, ConvertError> {
        if self.pages.is_empty() {
            return Err(ConvertError::DocumentWriteFailed(
                "document has no pages".into(),
            ));
        }
        self.doc.with_pages(self.pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let bytes = self.doc.save(&PdfSaveOptions::default(), &mut warnings);
        for w in &warnings {
            warn!("PDF writer: {:?}", w);
        }
        if bytes.is_empty() {
            return Err(ConvertError::DocumentWriteFailed(
                "writer produced no bytes".into(),
            ));
        }
        Ok(bytes)
    }
}
