//! Batch conversion entry points.
//!
//! [`convert`] takes already decoded pages and produces exactly one output
//! container. The `convert_files` / `convert_paths` / `convert_to_file`
//! wrappers add the decode step in front of it, and [`convert_sync`] runs the
//! whole thing on a private runtime for callers without one.
//!
//! Decoding is forgiving (a bad file is dropped), encoding is not: if any page
//! fails to encode, the run returns an error and nothing is written.

use crate::config::{ConversionConfig, RasterFormat, TargetFormat};
use crate::error::{ConvertError, EncodeError};
use crate::output::{ContainerKind, ConversionOutput, ConversionStats};
use crate::pipeline::archive::ArchiveBuilder;
use crate::pipeline::decode::{decode_files, DecodeOutcome, RasterPage};
use crate::pipeline::document::DocumentBuilder;
use crate::pipeline::encode::encode_surface;
use crate::pipeline::input::InputFile;
use crate::pipeline::rasterize::Surface;
use futures::future::join_all;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert decoded pages into a single PDF or ZIP.
///
/// Pages appear in the output in the order given.
///
/// # Errors
/// - [`ConvertError::NothingToConvert`] when `pages` is empty
/// - [`ConvertError::EncodeFailed`] when any page fails; no output is produced
pub async fn convert(
    pages: Vec<RasterPage>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    if pages.is_empty() {
        return Err(ConvertError::NothingToConvert);
    }

    let total_pages = pages.len();
    let start = Instant::now();
    info!("Converting {} page(s) to {:?}", total_pages, config.target);

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(total_pages);
    }

    let (kind, bytes) = match config.target {
        TargetFormat::Document => (ContainerKind::Document, build_document(pages, config).await?),
        TargetFormat::Image(format) => (
            ContainerKind::Archive,
            build_archive(pages, format, config).await?,
        ),
    };

    let encode_duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Conversion complete: {} page(s), {} bytes in {}ms",
        total_pages,
        bytes.len(),
        encode_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(total_pages, bytes.len());
    }

    let stats = ConversionStats {
        pages: total_pages,
        output_bytes: bytes.len(),
        encode_duration_ms,
        total_duration_ms: encode_duration_ms,
        ..ConversionStats::default()
    };

    Ok(ConversionOutput { kind, bytes, stats })
}

/// Decode `files` and convert every page they yield.
///
/// # Errors
/// [`ConvertError::NoValidInput`] when no file yields a page, otherwise as
/// for [`convert`].
pub async fn convert_files(
    files: Vec<InputFile>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let start = Instant::now();
    let outcome = decode_files(files, config).await;
    convert_outcome(outcome, config, start).await
}

/// Read files from disk, then decode and convert them.
///
/// An unreadable path counts as a failed file, like an undecodable one.
pub async fn convert_paths<P: AsRef<Path>>(
    paths: impl IntoIterator<Item = P>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let start = Instant::now();
    let paths: Vec<PathBuf> = paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect();

    let reads = join_all(paths.iter().map(InputFile::from_path)).await;
    let mut files = Vec::with_capacity(reads.len());
    let mut unreadable = 0;
    for (path, read) in paths.iter().zip(reads) {
        match read {
            Ok(file) => files.push(file),
            Err(e) => {
                warn!("Dropping '{}': {}", path.display(), e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_failed(&path.display().to_string(), &e.to_string());
                }
                unreadable += 1;
            }
        }
    }

    let mut outcome = decode_files(files, config).await;
    outcome.files += unreadable;
    outcome.failed += unreadable;
    convert_outcome(outcome, config, start).await
}

/// Convert `paths` and write the container to `output_path`.
///
/// Uses atomic write (temp file + rename) so a failed run never leaves a
/// partial file behind.
pub async fn convert_to_file<P: AsRef<Path>>(
    paths: impl IntoIterator<Item = P>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, ConvertError> {
    let output = convert_paths(paths, config).await?;
    let path = output_path.as_ref();
    let write_err = |e| ConvertError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    let tmp_path = PathBuf::from(tmp_path);

    tokio::fs::write(&tmp_path, &output.bytes)
        .await
        .map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    info!("Wrote {} ({} bytes)", path.display(), output.len());
    Ok(output.stats)
}

/// Synchronous wrapper around [`convert_paths`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync<P: AsRef<Path>>(
    paths: impl IntoIterator<Item = P>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_paths(paths, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn convert_outcome(
    outcome: DecodeOutcome,
    config: &ConversionConfig,
    start: Instant,
) -> Result<ConversionOutput, ConvertError> {
    let decode_duration_ms = start.elapsed().as_millis() as u64;
    if outcome.pages.is_empty() {
        return Err(ConvertError::NoValidInput {
            skipped: outcome.skipped,
            failed: outcome.failed,
        });
    }

    let mut output = convert(outcome.pages, config).await?;
    output.stats.input_files = outcome.files;
    output.stats.skipped_files = outcome.skipped;
    output.stats.failed_files = outcome.failed;
    output.stats.decode_duration_ms = decode_duration_ms;
    output.stats.total_duration_ms = start.elapsed().as_millis() as u64;
    Ok(output)
}

fn encode_failed(index: usize, name: &str, source: EncodeError) -> ConvertError {
    ConvertError::EncodeFailed {
        index,
        name: name.to_string(),
        source,
    }
}

/// Paint every page on one shared surface and append it to the document.
///
/// Runs sequentially on a single blocking thread.
async fn build_document(
    pages: Vec<RasterPage>,
    config: &ConversionConfig,
) -> Result<Vec<u8>, ConvertError> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || {
        let total = pages.len();
        let mut builder = DocumentBuilder::new(config.layout, config.snapshot_quality_percent());
        let mut surface = Surface::new();

        for (index, page) in pages.iter().enumerate() {
            let added = surface
                .paint(page, &config)
                .and_then(|()| builder.add_page(&surface));
            match added {
                Ok(len) => {
                    debug!("Page {}/{} '{}' added", index + 1, total, page.source_name);
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_page_complete(index, total, len);
                    }
                }
                Err(e) => {
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_page_error(index, total, &e.to_string());
                    }
                    return Err(encode_failed(index, &page.source_name, e));
                }
            }
        }

        builder.finish()
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("Document task panicked: {}", e)))?
}

/// Encode pages concurrently, each on its own surface, then zip them in order.
async fn build_archive(
    pages: Vec<RasterPage>,
    format: RasterFormat,
    config: &ConversionConfig,
) -> Result<Vec<u8>, ConvertError> {
    let total = pages.len();
    let shared = Arc::new(config.clone());
    let quality = if format.is_lossy() { config.quality_percent() } else { 100 };

    let mut encoded: Vec<(usize, String, String, Vec<u8>)> =
        stream::iter(pages.into_iter().enumerate().map(|(index, page)| {
            let config = Arc::clone(&shared);
            async move {
                let name = page.source_name.clone();
                let stem = page.stem.clone();
                let task_config = Arc::clone(&config);
                let result = tokio::task::spawn_blocking(move || {
                    let mut surface = Surface::new();
                    surface.paint(&page, &task_config)?;
                    encode_surface(&surface, format, quality)
                })
                .await
                .unwrap_or_else(|e| Err(EncodeError::Task(e.to_string())));

                match result {
                    Ok(bytes) => {
                        debug!("Page {}/{} '{}' → {} bytes", index + 1, total, name, bytes.len());
                        if let Some(ref cb) = config.progress_callback {
                            cb.on_page_complete(index, total, bytes.len());
                        }
                        Ok((index, name, stem, bytes))
                    }
                    Err(e) => {
                        if let Some(ref cb) = config.progress_callback {
                            cb.on_page_error(index, total, &e.to_string());
                        }
                        Err(encode_failed(index, &name, e))
                    }
                }
            }
        }))
        .buffer_unordered(config.concurrency)
        .try_collect()
        .await?;

    // Completion order is arbitrary; entry names depend on page order.
    encoded.sort_by_key(|(index, _, _, _)| *index);

    let level = config.compression_level;
    tokio::task::spawn_blocking(move || {
        let mut archive = ArchiveBuilder::new(level);
        for (index, name, stem, bytes) in &encoded {
            archive
                .insert(stem, format, bytes)
                .map_err(|e| encode_failed(*index, name, e))?;
        }
        archive.finish()
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("Archive task panicked: {}", e)))?
}
