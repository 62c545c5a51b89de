//! Progress-callback trait for per-file and per-page conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline decodes files and encodes pages. The library never
//! renders progress itself; the CLI forwards these events to an `indicatif`
//! bar.
//!
//! # Example
//!
//! ```rust
//! use rasterpack::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, index: usize, total: usize, encoded_len: usize) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("Page {}/{} done ({} bytes, {} finished)", index + 1, total, encoded_len, done);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it processes files and pages.
///
/// Implementations must be `Send + Sync`: decode events fire from concurrent
/// tasks, and archive-mode page events arrive in completion order. All
/// methods have default no-op implementations so callers only override what
/// they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before any file is decoded.
    fn on_decode_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called when a file produced at least one page.
    fn on_file_decoded(&self, name: &str, pages: usize) {
        let _ = (name, pages);
    }

    /// Called when a file was dropped because it could not be decoded.
    fn on_file_failed(&self, name: &str, error: &str) {
        let _ = (name, error);
    }

    /// Called once before the first page is encoded.
    ///
    /// # Arguments
    /// * `total_pages`: number of pages that will be encoded
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when a page has been encoded into the output container.
    ///
    /// # Arguments
    /// * `index`      : 0-based position of the page in the run
    /// * `total_pages`: total pages in the run
    /// * `encoded_len`: byte length of the page's encoded image
    fn on_page_complete(&self, index: usize, total_pages: usize, encoded_len: usize) {
        let _ = (index, total_pages, encoded_len);
    }

    /// Called when a page failed to encode. The run aborts afterwards.
    fn on_page_error(&self, index: usize, total_pages: usize, error: &str) {
        let _ = (index, total_pages, error);
    }

    /// Called once after the container has been finalised.
    ///
    /// # Arguments
    /// * `total_pages`: pages in the output
    /// * `output_len` : byte length of the finished container
    fn on_conversion_complete(&self, total_pages: usize, output_len: usize) {
        let _ = (total_pages, output_len);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

/// Completion percentage, rounded to the nearest whole number.
///
/// An empty run counts as complete.
pub fn percent_complete(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (done.min(total) as f64 / total as f64 * 100.0).round();
    pct as u8
}
