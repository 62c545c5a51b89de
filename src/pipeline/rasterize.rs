//! The drawing surface every page is painted onto before encoding.
//!
//! A [`Surface`] is an opaque RGB canvas. Painting fills it white and draws
//! the page scaled to fill it, so transparent regions of the source always
//! come out white, whatever the output format.
//!
//! Vector sources are supersampled: the surface is `factor` times their
//! natural size (bounded by `max_surface_edge`). Bitmaps are painted 1:1.
//! Configured [`ImageFilters`](crate::ImageFilters) act on the drawn page
//! only, never on the white background.

use crate::config::ConversionConfig;
use crate::error::EncodeError;
use crate::pipeline::decode::{PixelSource, RasterPage};
use crate::pipeline::filter;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage, RgbaImage};
use resvg::tiny_skia;
use tracing::debug;

/// An opaque RGB canvas.
#[derive(Debug, Clone)]
pub struct Surface {
    pixels: RgbImage,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface {
    /// An empty surface; it is sized on the first [`paint`](Self::paint).
    pub fn new() -> Self {
        Self {
            pixels: RgbImage::new(0, 0),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Resize to fit `page`, fill white and draw it.
    ///
    /// Everything previously on the surface is discarded.
    pub fn paint(&mut self, page: &RasterPage, config: &ConversionConfig) -> Result<(), EncodeError> {
        let factor = if page.is_vector() {
            effective_scale(
                page.natural_width,
                page.natural_height,
                config.supersample_factor,
                config.max_surface_edge,
            )
        } else {
            1
        };
        let width = page.natural_width.saturating_mul(factor);
        let height = page.natural_height.saturating_mul(factor);
        if width == 0 || height == 0 {
            return Err(EncodeError::Surface { width, height });
        }
        // Vectors are the only sources not already held in memory at full size.
        if page.is_vector() && width.max(height) > config.max_surface_edge {
            return Err(EncodeError::Surface { width, height });
        }

        debug!(
            "Painting '{}' at {}x{} (×{})",
            page.source_name, width, height, factor
        );

        let mut drawn = match &page.pixel_source {
            PixelSource::Bitmap(image) => draw_bitmap(image, width, height),
            PixelSource::Vector(tree) => draw_vector(tree, width, height)?,
        };
        filter::apply(&mut drawn, &config.filters);

        self.reset(width, height)?;
        for (dst, src) in self.pixels.pixels_mut().zip(drawn.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = Rgb([over_white(r, a), over_white(g, a), over_white(b, a)]);
        }
        Ok(())
    }

    /// Size the canvas to `width`×`height` and fill it white.
    fn reset(&mut self, width: u32, height: u32) -> Result<(), EncodeError> {
        if self.pixels.dimensions() == (width, height) {
            for px in self.pixels.pixels_mut() {
                *px = Rgb([255, 255, 255]);
            }
            return Ok(());
        }

        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(3))
            .ok_or(EncodeError::Surface { width, height })?;
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| EncodeError::Surface { width, height })?;
        buf.resize(len, 255);
        self.pixels =
            RgbImage::from_raw(width, height, buf).ok_or(EncodeError::Surface { width, height })?;
        Ok(())
    }
}

fn draw_bitmap(image: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        image.to_rgba8()
    } else {
        imageops::resize(&image.to_rgba8(), width, height, FilterType::Triangle)
    }
}

/// Render `tree` onto a transparent `width`×`height` canvas.
fn draw_vector(tree: &resvg::usvg::Tree, width: u32, height: u32) -> Result<RgbaImage, EncodeError> {
    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(EncodeError::Surface { width, height })?;

    let size = tree.size();
    let transform = tiny_skia::Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(tree, transform, &mut pixmap.as_mut());

    let mut buf = Vec::new();
    buf.try_reserve_exact(pixmap.data().len())
        .map_err(|_| EncodeError::Surface { width, height })?;
    for px in pixmap.pixels() {
        let c = px.demultiply();
        buf.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RgbaImage::from_raw(width, height, buf).ok_or(EncodeError::Surface { width, height })
}

/// Composite one straight-alpha channel over white.
fn over_white(c: u8, a: u8) -> u8 {
    let (c, a) = (c as u32, a as u32);
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}

/// The supersampling factor actually used for a `width`×`height` source.
///
/// Lowered from `factor` until the longest edge fits `max_edge`, but never
/// below 1: a source already larger than `max_edge` is painted at natural size.
pub fn effective_scale(width: u32, height: u32, factor: u32, max_edge: u32) -> u32 {
    let longest = width.max(height).max(1);
    factor.min(max_edge / longest).max(1)
}
