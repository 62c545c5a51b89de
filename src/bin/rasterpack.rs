//! CLI binary for rasterpack.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and writes the single output file.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use rasterpack::{
    convert_to_file, percent_complete, ContainerKind, ConversionConfig, ConversionProgressCallback,
    ImageFilters, Orientation, PaperSize, ProgressCallback, RasterFormat, TargetFormat,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while files decode, then a page bar while they encode.
/// Archive pages complete out of order, so lines are keyed by page index.
struct CliProgressCallback {
    bar: ProgressBar,
    dropped: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Decoding");
        bar.set_message("Reading files…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            dropped: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages {msg:>5}  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_decode_start(&self, total_files: usize) {
        self.bar.set_message(format!("{total_files} file(s)…"));
    }

    fn on_file_decoded(&self, name: &str, pages: usize) {
        self.bar.set_message(format!("{name} ({pages} page(s))"));
    }

    fn on_file_failed(&self, name: &str, error: &str) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} {}  {}",
            red("✗"),
            name,
            dim(&truncate(error, 80))
        ));
    }

    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_pages} page(s)…"))
        ));
    }

    fn on_page_complete(&self, index: usize, total: usize, encoded_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            index + 1,
            total,
            dim(&HumanBytes(encoded_len as u64).to_string()),
        ));
        self.bar.inc(1);
        let done = self.bar.position() as usize;
        self.bar.set_message(format!("{}%", percent_complete(done, total)));
    }

    fn on_page_error(&self, index: usize, total: usize, error: &str) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            index + 1,
            total,
            red(&truncate(error, 80)),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, output_len: usize) {
        self.bar.finish_and_clear();
        let dropped = self.dropped.load(Ordering::SeqCst);
        if dropped == 0 {
            eprintln!(
                "{} {} page(s) packed into {}",
                green("✔"),
                bold(&total_pages.to_string()),
                HumanBytes(output_len as u64)
            );
        } else {
            eprintln!(
                "{} {} page(s) packed into {}  ({} file(s) dropped)",
                cyan("⚠"),
                bold(&total_pages.to_string()),
                HumanBytes(output_len as u64),
                red(&dropped.to_string()),
            );
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max - 1).collect();
        format!("{cut}\u{2026}")
    } else {
        s.to_string()
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Pack photos into a ZIP of JPEGs (converted-images.zip)
  rasterpack *.png

  # Every page of every input in one PDF
  rasterpack -f pdf scan.pdf photo.jpg diagram.svg -o bundle.pdf

  # Smaller WebP images
  rasterpack -f webp -q 0.6 *.jpg -o web.zip

  # Landscape Letter pages with a wider margin
  rasterpack -f pdf --paper letter --landscape --margin 36 slides/*.png

  # Darker, grayscale scans
  rasterpack -f pdf --grayscale --brightness -15 scans/*.jpg

  # Machine-readable run statistics
  rasterpack --json -f png report.pdf > stats.json

FORMATS:
  pdf     one PDF, one page per image or PDF page (A4, 10 pt margin)
  jpeg    ZIP of .jpeg files        quality applies
  jpg     ZIP of .jpg files         quality applies
  webp    ZIP of .webp files        quality applies
  png     ZIP of .png files
  bmp     ZIP of .bmp files

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory) for PDF inputs
  RUST_LOG                Override the log filter (e.g. rasterpack=debug)
"#;

/// Convert images and PDFs into one PDF or a ZIP of images.
#[derive(Parser, Debug)]
#[command(
    name = "rasterpack",
    version,
    about = "Convert images and PDFs into one PDF or a ZIP of re-encoded images",
    long_about = "Batch-convert images (JPEG, PNG, WebP, BMP, GIF, TIFF, SVG) and PDF pages into \
a single multi-page PDF or a ZIP archive of images in one format. Unsupported files are skipped \
and unreadable ones are dropped; the rest still convert.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image, SVG or PDF files to convert, in output order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output file. Default: converted-files.pdf or converted-images.zip.
    #[arg(short, long, env = "RASTERPACK_OUTPUT")]
    output: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, env = "RASTERPACK_FORMAT", value_enum, default_value = "jpeg")]
    format: FormatArg,

    /// Encoder quality for jpeg/jpg/webp (0.1–1.0).
    #[arg(short, long, env = "RASTERPACK_QUALITY", default_value_t = 0.9)]
    quality: f32,

    /// Paper size for PDF output.
    #[arg(long, env = "RASTERPACK_PAPER", value_enum, default_value = "a4")]
    paper: PaperArg,

    /// Landscape PDF pages.
    #[arg(long, env = "RASTERPACK_LANDSCAPE")]
    landscape: bool,

    /// PDF page margin in points.
    #[arg(long, env = "RASTERPACK_MARGIN", default_value_t = 10.0)]
    margin: f32,

    /// ZIP DEFLATE level (0–9).
    #[arg(long, env = "RASTERPACK_COMPRESSION_LEVEL", default_value_t = 6,
          value_parser = clap::value_parser!(i64).range(0..=9))]
    compression_level: i64,

    /// Pages encoded at once in ZIP mode. Default: number of CPUs.
    #[arg(short, long, env = "RASTERPACK_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Supersampling factor for SVG inputs (1–16).
    #[arg(long, env = "RASTERPACK_SUPERSAMPLE", default_value_t = 10,
          value_parser = clap::value_parser!(u32).range(1..=16))]
    supersample: u32,

    /// Scale PDF pages are rendered at (1.5–2.0).
    #[arg(long, env = "RASTERPACK_PDF_SCALE", default_value_t = 2.0)]
    pdf_scale: f32,

    /// Brightness offset in percent (-100–100).
    #[arg(long, env = "RASTERPACK_BRIGHTNESS", default_value_t = 0, allow_hyphen_values = true,
          value_parser = clap::value_parser!(i32).range(-100..=100))]
    brightness: i32,

    /// Contrast offset in percent (-100–100).
    #[arg(long, env = "RASTERPACK_CONTRAST", default_value_t = 0, allow_hyphen_values = true,
          value_parser = clap::value_parser!(i32).range(-100..=100))]
    contrast: i32,

    /// Saturation offset in percent (-100–100).
    #[arg(long, env = "RASTERPACK_SATURATION", default_value_t = 0, allow_hyphen_values = true,
          value_parser = clap::value_parser!(i32).range(-100..=100))]
    saturation: i32,

    /// Gaussian blur radius in pixels (0–50).
    #[arg(long, env = "RASTERPACK_BLUR", default_value_t = 0.0)]
    blur: f32,

    /// Sepia tone every page.
    #[arg(long, env = "RASTERPACK_SEPIA")]
    sepia: bool,

    /// Convert every page to grayscale.
    #[arg(long, env = "RASTERPACK_GRAYSCALE")]
    grayscale: bool,

    /// Path to libpdfium (file or directory).
    #[arg(long, env = "RASTERPACK_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Print run statistics as JSON on stdout.
    #[arg(long, env = "RASTERPACK_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "RASTERPACK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RASTERPACK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(long, env = "RASTERPACK_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Pdf,
    Jpeg,
    Jpg,
    Png,
    Webp,
    Bmp,
}

impl From<FormatArg> for TargetFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Pdf => TargetFormat::Document,
            FormatArg::Jpeg => TargetFormat::Image(RasterFormat::Jpeg),
            FormatArg::Jpg => TargetFormat::Image(RasterFormat::Jpg),
            FormatArg::Png => TargetFormat::Image(RasterFormat::Png),
            FormatArg::Webp => TargetFormat::Image(RasterFormat::WebP),
            FormatArg::Bmp => TargetFormat::Image(RasterFormat::Bmp),
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PaperArg {
    A3,
    A4,
    A5,
    Letter,
    Legal,
}

impl From<PaperArg> for PaperSize {
    fn from(v: PaperArg) -> Self {
        match v {
            PaperArg::A3 => PaperSize::A3,
            PaperArg::A4 => PaperSize::A4,
            PaperArg::A5 => PaperSize::A5,
            PaperArg::Letter => PaperSize::Letter,
            PaperArg::Legal => PaperSize::Legal,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; -v brings them back.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    let output_path = cli.output.clone().unwrap_or_else(|| {
        let kind = match config.target {
            TargetFormat::Document => ContainerKind::Document,
            TargetFormat::Image(_) => ContainerKind::Archive,
        };
        PathBuf::from(kind.default_file_name())
    });

    // ── Run conversion ───────────────────────────────────────────────────
    let stats = match convert_to_file(&cli.inputs, &output_path, &config).await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::debug!("Conversion failed: {e}");
            eprintln!("{} {}", red("✘"), e.user_message());
            std::process::exit(1);
        }
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {}/{} files  {} pages  {}  {}ms  →  {}",
            if stats.failed_files == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.input_files - stats.skipped_files - stats.failed_files,
            stats.input_files,
            stats.pages,
            HumanBytes(stats.output_bytes as u64),
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .target(cli.format.into())
        .quality(cli.quality)
        .paper_size(cli.paper.into())
        .orientation(if cli.landscape {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        })
        .margin_pt(cli.margin)
        .compression_level(cli.compression_level)
        .supersample_factor(cli.supersample)
        .pdf_render_scale(cli.pdf_scale)
        .filters(ImageFilters {
            brightness: cli.brightness,
            contrast: cli.contrast,
            saturation: cli.saturation,
            blur: cli.blur,
            sepia: cli.sepia,
            grayscale: cli.grayscale,
        });

    if let Some(n) = cli.concurrency {
        builder = builder.concurrency(n);
    }
    if let Some(ref path) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(path);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
