//! End-to-end tests over the public API.
//!
//! Fixtures are generated in memory with `image`; a fake `PdfRasterizer`
//! stands in for pdfium so PDF inputs work without the native library.
//! A pdfium-backed test at the bottom runs only when the library binds.

use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use rasterpack::{
    convert, convert_files, ContainerKind, ConversionConfig, ConversionProgressCallback,
    ConvertError, DecodeError, ImageFilters, InputFile, PdfRasterizer, PdfiumRasterizer,
    RasterFormat, RasterPage, TargetFormat,
};
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Fixtures ─────────────────────────────────────────────────────────────

fn encoded(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

fn jpeg(w: u32, h: u32, colour: [u8; 3]) -> Vec<u8> {
    encoded(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(colour))),
        ImageFormat::Jpeg,
    )
}

fn png(w: u32, h: u32, colour: [u8; 3]) -> Vec<u8> {
    encoded(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(colour))),
        ImageFormat::Png,
    )
}

/// Renders `pages` solid pages; page `n` is `100 + n` pixels wide so tests
/// can tell pages apart by size.
struct FakePdf {
    pages: usize,
}

impl PdfRasterizer for FakePdf {
    fn rasterize(
        &self,
        bytes: &[u8],
        _scale: f32,
    ) -> Result<Vec<(usize, DynamicImage)>, DecodeError> {
        if !bytes.starts_with(b"%PDF") {
            return Err(DecodeError::Pdf("not a PDF".into()));
        }
        // Out of order on purpose.
        Ok((0..self.pages)
            .rev()
            .map(|i| {
                (
                    i,
                    DynamicImage::ImageRgb8(RgbImage::from_pixel(
                        100 + i as u32,
                        50,
                        Rgb([0, 0, 200]),
                    )),
                )
            })
            .collect())
    }
}

fn fake_pdf_file(name: &str) -> InputFile {
    InputFile::new(name, "application/pdf", b"%PDF-1.7 fake".to_vec())
}

fn config(target: TargetFormat, pdf_pages: usize) -> ConversionConfig {
    ConversionConfig::builder()
        .target(target)
        .pdf_rasterizer(Arc::new(FakePdf { pages: pdf_pages }))
        .build()
        .unwrap()
}

fn zip_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..zip.len())
        .map(|i| {
            let mut entry = zip.by_index(i).unwrap();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            (entry.name().to_string(), data)
        })
        .collect()
}

fn pdf_page_count(bytes: &[u8]) -> usize {
    lopdf::Document::load_mem(bytes).unwrap().get_pages().len()
}

// ── Archive mode ─────────────────────────────────────────────────────────

#[tokio::test]
async fn image_and_pdf_to_png_archive() {
    let files = vec![
        InputFile::new("holiday.jpg", "image/jpeg", jpeg(800, 600, [200, 100, 50])),
        fake_pdf_file("report.pdf"),
    ];
    let cfg = config(TargetFormat::Image(RasterFormat::Png), 2);

    let out = convert_files(files, &cfg).await.unwrap();
    assert_eq!(out.kind, ContainerKind::Archive);
    assert_eq!(out.file_name(), "converted-images.zip");

    let entries = zip_entries(&out.bytes);
    let names: Vec<_> = entries.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(
        names,
        ["holiday.png", "report-page-1.png", "report-page-2.png"]
    );

    let first = image::load_from_memory_with_format(&entries[0].1, ImageFormat::Png).unwrap();
    assert_eq!(first.dimensions(), (800, 600));
    let page2 = image::load_from_memory_with_format(&entries[2].1, ImageFormat::Png).unwrap();
    assert_eq!(page2.dimensions(), (101, 50));

    assert_eq!(out.stats.input_files, 2);
    assert_eq!(out.stats.pages, 3);
}

#[tokio::test]
async fn every_archive_format_decodes_as_itself() {
    for format in [
        RasterFormat::Jpeg,
        RasterFormat::Jpg,
        RasterFormat::Png,
        RasterFormat::WebP,
        RasterFormat::Bmp,
    ] {
        let files = vec![
            InputFile::new("a.png", "image/png", png(16, 12, [10, 200, 10])),
            InputFile::new("b.jpg", "image/jpeg", jpeg(12, 16, [10, 10, 200])),
        ];
        let out = convert_files(files, &config(TargetFormat::Image(format), 0))
            .await
            .unwrap();

        let entries = zip_entries(&out.bytes);
        assert_eq!(entries.len(), 2, "{format:?}");
        for ((name, data), stem) in entries.iter().zip(["a", "b"]) {
            assert_eq!(name, &format!("{stem}.{}", format.extension()));
            assert_eq!(
                image::guess_format(data).unwrap(),
                format.image_format(),
                "{name}"
            );
        }
    }
}

#[tokio::test]
async fn archive_order_survives_concurrency() {
    let files: Vec<_> = (0..12)
        .map(|i| {
            InputFile::new(
                format!("img{i:02}.png"),
                "image/png",
                png(20 + i * 7, 10, [i as u8 * 20, 0, 0]),
            )
        })
        .collect();
    let cfg = ConversionConfig::builder()
        .target(TargetFormat::Image(RasterFormat::Png))
        .concurrency(4)
        .build()
        .unwrap();

    let out = convert_files(files, &cfg).await.unwrap();
    for (i, (name, data)) in zip_entries(&out.bytes).iter().enumerate() {
        assert_eq!(name, &format!("img{i:02}.png"));
        let img = image::load_from_memory(data).unwrap();
        assert_eq!(img.width(), 20 + i as u32 * 7);
    }
}

#[tokio::test]
async fn colliding_stems_are_suffixed() {
    let files = vec![
        InputFile::new("a.png", "image/png", png(4, 4, [0, 0, 0])),
        InputFile::new("a.jpg", "image/jpeg", jpeg(4, 4, [0, 0, 0])),
        InputFile::new("a.bmp", "image/bmp", png(4, 4, [0, 0, 0])),
    ];
    let out = convert_files(files, &config(TargetFormat::Image(RasterFormat::WebP), 0))
        .await
        .unwrap();
    let names: Vec<_> = zip_entries(&out.bytes).into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, ["a.webp", "a-2.webp", "a-3.webp"]);
}

#[tokio::test]
async fn transparent_pixels_become_white() {
    let mut img = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]));
    img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
    let bytes = encoded(DynamicImage::ImageRgba8(img), ImageFormat::Png);

    let out = convert_files(
        vec![InputFile::new("logo.png", "image/png", bytes)],
        &config(TargetFormat::Image(RasterFormat::Png), 0),
    )
    .await
    .unwrap();

    let entries = zip_entries(&out.bytes);
    let back = image::load_from_memory(&entries[0].1).unwrap().to_rgb8();
    assert_eq!(back.get_pixel(0, 0), &Rgb([0, 0, 0]));
    assert_eq!(back.get_pixel(5, 5), &Rgb([255, 255, 255]));
}

#[tokio::test]
async fn svg_is_supersampled_bitmap_is_not() {
    let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="30" height="20"><circle cx="15" cy="10" r="8" fill="green"/></svg>"#;
    let files = vec![
        InputFile::new("icon.svg", "image/svg+xml", svg.to_vec()),
        InputFile::new("photo.png", "image/png", png(30, 20, [1, 2, 3])),
    ];
    let out = convert_files(files, &config(TargetFormat::Image(RasterFormat::Png), 0))
        .await
        .unwrap();

    let entries = zip_entries(&out.bytes);
    let icon = image::load_from_memory(&entries[0].1).unwrap();
    let photo = image::load_from_memory(&entries[1].1).unwrap();
    assert_eq!(icon.dimensions(), (300, 200));
    assert_eq!(photo.dimensions(), (30, 20));
}

/// Smooth gradients with mild noise, closer to a photo than flat fills.
fn photo_png(w: u32, h: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(w, h, |x, y| {
        let noise = ((x * 7919 + y * 104_729) % 23) as u8;
        Rgb([
            (x * 255 / w) as u8 / 2 + noise * 4,
            (y * 255 / h) as u8 / 2 + noise * 3,
            ((x + y) * 255 / (w + h)) as u8 / 2 + noise * 2,
        ])
    });
    encoded(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

#[tokio::test]
async fn lossy_quality_sweep_is_monotonic() {
    let bytes = photo_png(200, 150);
    for format in [RasterFormat::Jpeg, RasterFormat::Jpg, RasterFormat::WebP] {
        let mut sizes = Vec::new();
        for step in 2..=20 {
            let q = step as f32 * 0.05;
            let cfg = ConversionConfig::builder()
                .target(TargetFormat::Image(format))
                .quality(q)
                .build()
                .unwrap();
            let files = vec![InputFile::new("photo.png", "image/png", bytes.clone())];
            let out = convert_files(files, &cfg).await.unwrap();
            let entries = zip_entries(&out.bytes);
            sizes.push((q, entries[0].1.len()));
        }
        for pair in sizes.windows(2) {
            assert!(pair[0].1 <= pair[1].1, "{format:?} shrank: {sizes:?}");
        }
        assert!(sizes[0].1 < sizes[sizes.len() - 1].1, "{format:?}: {sizes:?}");
    }
}

#[tokio::test]
async fn grayscale_filter_reaches_archive_entries() {
    let cfg = ConversionConfig::builder()
        .target(TargetFormat::Image(RasterFormat::Png))
        .filters(ImageFilters {
            grayscale: true,
            ..ImageFilters::default()
        })
        .build()
        .unwrap();
    let files = vec![InputFile::new("red.png", "image/png", png(6, 6, [255, 0, 0]))];
    let out = convert_files(files, &cfg).await.unwrap();

    let entries = zip_entries(&out.bytes);
    let back = image::load_from_memory(&entries[0].1).unwrap().to_rgb8();
    assert_eq!(back.get_pixel(3, 3), &Rgb([54, 54, 54]));
}

#[tokio::test]
async fn oversized_svg_is_dropped_not_fatal() {
    let huge = br#"<svg xmlns="http://www.w3.org/2000/svg" width="40000" height="40000"/>"#;
    let files = vec![
        InputFile::new("poster.svg", "image/svg+xml", huge.to_vec()),
        InputFile::new("ok.png", "image/png", png(4, 4, [0, 0, 0])),
    ];
    let out = convert_files(files, &config(TargetFormat::Image(RasterFormat::Png), 0))
        .await
        .unwrap();
    let names: Vec<_> = zip_entries(&out.bytes).into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, ["ok.png"]);
    assert_eq!(out.stats.failed_files, 1);
}

// ── Document mode ────────────────────────────────────────────────────────

#[tokio::test]
async fn image_and_pdf_to_document() {
    let files = vec![
        InputFile::new("holiday.jpg", "image/jpeg", jpeg(800, 600, [200, 100, 50])),
        fake_pdf_file("report.pdf"),
    ];
    let out = convert_files(files, &config(TargetFormat::Document, 2))
        .await
        .unwrap();

    assert_eq!(out.kind, ContainerKind::Document);
    assert_eq!(out.file_name(), "converted-files.pdf");
    assert!(out.bytes.starts_with(b"%PDF"));
    assert_eq!(pdf_page_count(&out.bytes), 3);
    assert_eq!(out.stats.pages, 3);
}

fn dict<'a>(doc: &'a lopdf::Document, obj: &'a lopdf::Object) -> &'a lopdf::Dictionary {
    doc.dereference(obj).unwrap().1.as_dict().unwrap()
}

/// Pixel size of the image each page draws, in page order.
fn drawn_image_sizes(bytes: &[u8]) -> Vec<(i64, i64)> {
    let doc = lopdf::Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let content =
                lopdf::content::Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
            let draw = content
                .operations
                .iter()
                .find(|op| op.operator == "Do")
                .expect("page draws an XObject");
            let name = draw.operands[0].as_name().unwrap();

            let page = doc.get_dictionary(page_id).unwrap();
            let resources = dict(&doc, page.get(b"Resources").unwrap());
            let xobjects = dict(&doc, resources.get(b"XObject").unwrap());
            let (_, image) = doc.dereference(xobjects.get(name).unwrap()).unwrap();
            let image = &image.as_stream().unwrap().dict;
            (
                image.get(b"Width").unwrap().as_i64().unwrap(),
                image.get(b"Height").unwrap().as_i64().unwrap(),
            )
        })
        .collect()
}

#[tokio::test]
async fn document_pages_draw_inputs_in_selection_order() {
    let files = vec![
        InputFile::new("wide.png", "image/png", png(80, 60, [9, 9, 9])),
        fake_pdf_file("deck.pdf"),
        InputFile::new("tall.jpg", "image/jpeg", jpeg(30, 90, [200, 0, 0])),
        InputFile::new("square.png", "image/png", png(50, 50, [0, 0, 200])),
    ];
    let out = convert_files(files, &config(TargetFormat::Document, 3))
        .await
        .unwrap();

    assert_eq!(
        drawn_image_sizes(&out.bytes),
        [(80, 60), (100, 50), (101, 50), (102, 50), (30, 90), (50, 50)]
    );
}

#[tokio::test]
async fn convert_accepts_prebuilt_pages() {
    let pages = vec![
        RasterPage::from_image("x.png", 10, DynamicImage::new_rgb8(10, 40)).unwrap(),
        RasterPage::from_image("y.png", 10, DynamicImage::new_rgb8(40, 10)).unwrap(),
    ];
    let out = convert(pages, &config(TargetFormat::Document, 0))
        .await
        .unwrap();
    assert_eq!(pdf_page_count(&out.bytes), 2);
}

// ── Empty and failing inputs ─────────────────────────────────────────────

#[tokio::test]
async fn only_unsupported_files_is_an_empty_result() {
    let files = vec![
        InputFile::new("notes.txt", "text/plain", b"hi".to_vec()),
        InputFile::new("song.mp3", "audio/mpeg", vec![0; 16]),
    ];
    let err = convert_files(files, &ConversionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ConvertError::NoValidInput {
            skipped: 2,
            failed: 0
        }
    ));
    assert_eq!(err.user_message(), "No valid image or PDF files were selected.");
}

#[tokio::test]
async fn all_files_failing_is_an_empty_result() {
    let files = vec![
        InputFile::new("broken.png", "image/png", b"garbage".to_vec()),
        InputFile::new("broken.pdf", "application/pdf", b"garbage".to_vec()),
    ];
    let err = convert_files(files, &config(TargetFormat::Document, 1))
        .await
        .unwrap_err();
    assert!(err.is_empty_result());
    assert!(matches!(err, ConvertError::NoValidInput { failed: 2, .. }));
}

#[tokio::test]
async fn bad_files_are_dropped_and_reported() {
    struct Failures(AtomicUsize);
    impl ConversionProgressCallback for Failures {
        fn on_file_failed(&self, _name: &str, _error: &str) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let failures = Arc::new(Failures(AtomicUsize::new(0)));
    let cfg = ConversionConfig::builder()
        .target(TargetFormat::Image(RasterFormat::Png))
        .progress_callback(Arc::clone(&failures) as Arc<dyn ConversionProgressCallback>)
        .build()
        .unwrap();
    let files = vec![
        InputFile::new("bad.jpg", "image/jpeg", b"nope".to_vec()),
        InputFile::new("good.png", "image/png", png(3, 3, [1, 1, 1])),
        InputFile::new("readme.md", "text/markdown", b"#".to_vec()),
    ];

    let out = convert_files(files, &cfg).await.unwrap();
    let names: Vec<_> = zip_entries(&out.bytes).into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, ["good.png"]);
    assert_eq!(failures.0.load(Ordering::SeqCst), 1);
    assert_eq!(out.stats.failed_files, 1);
    assert_eq!(out.stats.skipped_files, 1);
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// Uses the real engine when it can be bound; otherwise there is nothing to test.
#[tokio::test]
async fn pdfium_renders_generated_document() {
    if PdfiumRasterizer::default().bind().is_err() {
        eprintln!("pdfium not available, skipping");
        return;
    }

    // Build a two-page PDF with the crate itself, then feed it back in.
    let pages = vec![
        RasterPage::from_image("p1.png", 0, DynamicImage::new_rgb8(60, 80)).unwrap(),
        RasterPage::from_image("p2.png", 0, DynamicImage::new_rgb8(80, 60)).unwrap(),
    ];
    let doc = convert(
        pages,
        &ConversionConfig::builder()
            .target(TargetFormat::Document)
            .build()
            .unwrap(),
    )
    .await
    .unwrap();

    let cfg = ConversionConfig::builder()
        .target(TargetFormat::Image(RasterFormat::Png))
        .build()
        .unwrap();
    let out = convert_files(
        vec![InputFile::new("roundtrip.pdf", "application/pdf", doc.bytes)],
        &cfg,
    )
    .await
    .unwrap();
    let names: Vec<_> = zip_entries(&out.bytes).into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, ["roundtrip-page-1.png", "roundtrip-page-2.png"]);
}
