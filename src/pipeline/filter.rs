//! Colour filters applied to a drawn page.
//!
//! The arithmetic follows the CSS filter functions of the same names
//! (`brightness()`, `contrast()`, `saturate()`, `blur()`, `sepia()`,
//! `grayscale()`), each result clamped before the next step. Alpha is never
//! changed except by blur.

use crate::config::ImageFilters;
use image::{imageops, RgbaImage};

type Matrix = [[f32; 3]; 3];

const SEPIA: Matrix = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

const GRAYSCALE: Matrix = [
    [0.2126, 0.7152, 0.0722],
    [0.2126, 0.7152, 0.0722],
    [0.2126, 0.7152, 0.0722],
];

fn saturate(s: f32) -> Matrix {
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn apply_matrix(rgb: [f32; 3], m: &Matrix) -> [f32; 3] {
    let mut out = [0.0; 3];
    for (o, row) in out.iter_mut().zip(m) {
        *o = (row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2]).clamp(0.0, 1.0);
    }
    out
}

/// Apply `filters` to `img` in place.
pub fn apply(img: &mut RgbaImage, filters: &ImageFilters) {
    if filters.is_identity() {
        return;
    }

    let brightness = 1.0 + filters.brightness as f32 / 100.0;
    let contrast = 1.0 + filters.contrast as f32 / 100.0;
    let saturation = (filters.saturation != 0)
        .then(|| saturate(1.0 + filters.saturation as f32 / 100.0));
    map_rgb(img, |mut c| {
        for v in c.iter_mut() {
            *v = (*v * brightness).clamp(0.0, 1.0);
            *v = ((*v - 0.5) * contrast + 0.5).clamp(0.0, 1.0);
        }
        match saturation {
            Some(ref m) => apply_matrix(c, m),
            None => c,
        }
    });

    if filters.blur > 0.0 {
        *img = imageops::blur(&*img, filters.blur);
    }

    if filters.sepia {
        map_rgb(img, |c| apply_matrix(c, &SEPIA));
    }
    if filters.grayscale {
        map_rgb(img, |c| apply_matrix(c, &GRAYSCALE));
    }
}

fn map_rgb(img: &mut RgbaImage, f: impl Fn([f32; 3]) -> [f32; 3]) {
    for px in img.pixels_mut() {
        let c = f([
            px[0] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[2] as f32 / 255.0,
        ]);
        for (dst, v) in px.0.iter_mut().zip(c) {
            *dst = (v * 255.0).round() as u8;
        }
    }
}
