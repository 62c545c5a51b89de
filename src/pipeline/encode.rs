//! Image encoding: painted [`Surface`] → bytes in the requested format.
//!
//! JPEG and WebP are lossy and honour the quality setting; WebP goes through
//! libwebp since the `image` crate only writes lossless WebP. PNG and BMP
//! ignore quality.

use crate::config::RasterFormat;
use crate::error::EncodeError;
use crate::pipeline::rasterize::Surface;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbImage};
use std::io::Cursor;
use tracing::debug;

/// Longest edge of preview thumbnails.
const PREVIEW_EDGE: u32 = 256;

/// Largest edge libwebp accepts.
const WEBP_MAX_EDGE: u32 = 16_383;

/// Encode a painted surface. `quality` is on the codecs' 1–100 scale.
pub fn encode_surface(
    surface: &Surface,
    format: RasterFormat,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    encode_rgb(surface.pixels(), format, quality)
}

/// Encode an opaque RGB buffer. `quality` is on the codecs' 1–100 scale.
pub fn encode_rgb(img: &RgbImage, format: RasterFormat, quality: u8) -> Result<Vec<u8>, EncodeError> {
    let (w, h) = img.dimensions();
    let quality = quality.clamp(1, 100);
    let mut buf = Vec::new();

    match format {
        RasterFormat::Jpeg | RasterFormat::Jpg => {
            JpegEncoder::new_with_quality(&mut buf, quality).write_image(
                img.as_raw(),
                w,
                h,
                ExtendedColorType::Rgb8,
            )?;
        }
        RasterFormat::WebP => {
            if w > WEBP_MAX_EDGE || h > WEBP_MAX_EDGE {
                return Err(EncodeError::Dimensions {
                    format: "WebP",
                    width: w,
                    height: h,
                });
            }
            let memory = webp::Encoder::from_rgb(img.as_raw(), w, h)
                .encode_simple(false, quality as f32)
                .map_err(|e| EncodeError::WebP(format!("{e:?}")))?;
            buf.extend_from_slice(&memory);
        }
        RasterFormat::Png | RasterFormat::Bmp => {
            img.write_to(&mut Cursor::new(&mut buf), format.image_format())?;
        }
    }

    if buf.is_empty() {
        return Err(EncodeError::EmptyOutput);
    }
    debug!("Encoded {}x{} {:?} → {} bytes", w, h, format, buf.len());
    Ok(buf)
}

/// PNG thumbnail of `img` as a `data:` URI, for previews.
pub fn preview_data_uri(img: &DynamicImage) -> Result<String, image::ImageError> {
    let thumb;
    let img = if img.width() > PREVIEW_EDGE || img.height() > PREVIEW_EDGE {
        thumb = img.thumbnail(PREVIEW_EDGE, PREVIEW_EDGE);
        &thumb
    } else {
        img
    };

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&buf)))
}

/// The SVG source itself as a `data:` URI.
pub fn svg_data_uri(svg: &[u8]) -> String {
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}
