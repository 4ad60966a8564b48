//! Progress tracking and reporting for conversions

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Progress callback for conversion operations
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Events emitted during a conversion
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Aggregate download percentage (0-100)
    Percent {
        percent: u8,
    },
    OverrideCopied {
        path: String,
        size: u64,
    },
    FilePlaced {
        path: String,
        size: u64,
    },
    /// File needs manual download by the user
    FileDeferred {
        path: String,
        url: String,
    },
    FileFailed {
        path: String,
        url: String,
        error: String,
    },
    /// Manifest entry was invalid and ignored
    FileSkipped {
        reason: String,
    },
    SizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },
}

/// Byte counters shared by the download tasks of one conversion
///
/// The total starts as the sum of declared sizes of all valid files and is
/// reduced whenever a file is deferred or fails, so a later reduction can make
/// the reported percentage jump forward relative to earlier reports.
#[derive(Debug, Default)]
pub struct ProgressState {
    total_expected_bytes: AtomicU64,
    downloaded_bytes: AtomicU64,
}

impl ProgressState {
    pub fn new(total_expected_bytes: u64) -> Self {
        Self {
            total_expected_bytes: AtomicU64::new(total_expected_bytes),
            downloaded_bytes: AtomicU64::new(0),
        }
    }

    pub fn total_expected_bytes(&self) -> u64 {
        self.total_expected_bytes.load(Ordering::Relaxed)
    }

    pub fn downloaded_bytes(&self) -> u64 {
        self.downloaded_bytes.load(Ordering::Relaxed)
    }

    /// Count a placed file by its declared size and return the new percentage
    pub fn record_downloaded(&self, declared_size: u64) -> u8 {
        self.downloaded_bytes.fetch_add(declared_size, Ordering::Relaxed);
        self.percent()
    }

    /// Remove a deferred or failed file from the expected total
    pub fn reduce_total(&self, declared_size: u64) {
        let _ = self
            .total_expected_bytes
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |total| {
                Some(total.saturating_sub(declared_size))
            });
    }

    /// `round(100 * downloaded / total)`, or 0 when nothing is expected
    pub fn percent(&self) -> u8 {
        let total = self.total_expected_bytes();
        if total == 0 {
            return 0;
        }
        let ratio = self.downloaded_bytes() as f64 / total as f64;
        (ratio * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Trait for progress reporting with more granular control
pub trait ProgressReporter: Send + Sync {
    fn on_percent(&self, _percent: u8) {}
    fn on_override_copied(&self, _path: &str, _size: u64) {}
    fn on_file_placed(&self, _path: &str, _size: u64) {}
    fn on_file_deferred(&self, _path: &str, _url: &str) {}
    fn on_file_failed(&self, _path: &str, _url: &str, _error: &str) {}
    fn on_file_skipped(&self, _reason: &str) {}
    fn on_size_mismatch(&self, _path: &str, _expected: u64, _actual: u64) {}
}

/// Extension trait to convert ProgressReporter to ProgressCallback
pub trait IntoProgressCallback {
    fn into_callback(self) -> ProgressCallback;
}

impl<T: ProgressReporter + 'static> IntoProgressCallback for T {
    fn into_callback(self) -> ProgressCallback {
        Arc::new(move |event| match event {
            ProgressEvent::Percent { percent } => self.on_percent(percent),
            ProgressEvent::OverrideCopied { path, size } => {
                self.on_override_copied(&path, size);
            }
            ProgressEvent::FilePlaced { path, size } => self.on_file_placed(&path, size),
            ProgressEvent::FileDeferred { path, url } => self.on_file_deferred(&path, &url),
            ProgressEvent::FileFailed { path, url, error } => {
                self.on_file_failed(&path, &url, &error);
            }
            ProgressEvent::FileSkipped { reason } => self.on_file_skipped(&reason),
            ProgressEvent::SizeMismatch { path, expected, actual } => {
                self.on_size_mismatch(&path, expected, actual);
            }
        })
    }
}

/// Adapt a plain `Fn(percent)` into a callback that ignores other events
pub fn percent_callback<F>(on_progress: F) -> ProgressCallback
where
    F: Fn(u8) + Send + Sync + 'static,
{
    Arc::new(move |event| {
        if let ProgressEvent::Percent { percent } = event {
            on_progress(percent);
        }
    })
}

pub(crate) fn emit(callback: &Option<ProgressCallback>, event: ProgressEvent) {
    if let Some(callback) = callback {
        callback(event);
    }
}

/// Simple console progress reporter implementation
#[derive(Debug, Default)]
pub struct ConsoleProgressReporter {
    pub verbose: bool,
}

impl ConsoleProgressReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn on_percent(&self, percent: u8) {
        println!("⏬ Downloading files: {}%", percent);
    }

    fn on_override_copied(&self, path: &str, size: u64) {
        if self.verbose {
            println!("📄 Override: {} ({} bytes)", path, size);
        }
    }

    fn on_file_placed(&self, path: &str, size: u64) {
        if self.verbose {
            println!("✅ Added: {} ({} bytes)", path, size);
        }
    }

    fn on_file_deferred(&self, path: &str, url: &str) {
        println!("🖐️  Manual download needed for {}: {}", path, url);
    }

    fn on_file_failed(&self, path: &str, url: &str, error: &str) {
        eprintln!("❌ Failed to download {} from {}: {}", path, url, error);
    }

    fn on_file_skipped(&self, reason: &str) {
        if self.verbose {
            println!("⚠️  Skipped manifest entry: {}", reason);
        }
    }

    fn on_size_mismatch(&self, path: &str, expected: u64, actual: u64) {
        if self.verbose {
            println!(
                "⚠️  Size mismatch for {}: expected {} bytes, got {}",
                path, expected, actual
            );
        }
    }
}

/// Null progress reporter that does nothing
#[derive(Debug, Default)]
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn percent_rounds_against_current_total() {
        let state = ProgressState::new(300);
        assert_eq!(state.percent(), 0);
        assert_eq!(state.record_downloaded(100), 33);
        assert_eq!(state.record_downloaded(100), 67);
        assert_eq!(state.record_downloaded(100), 100);
    }

    #[test]
    fn reducing_total_raises_percentage() {
        let state = ProgressState::new(200);
        assert_eq!(state.record_downloaded(100), 50);
        state.reduce_total(100);
        assert_eq!(state.total_expected_bytes(), 100);
        assert_eq!(state.percent(), 100);
    }

    #[test]
    fn zero_total_reports_zero() {
        let state = ProgressState::new(50);
        state.reduce_total(50);
        assert_eq!(state.percent(), 0);
        state.reduce_total(10);
        assert_eq!(state.total_expected_bytes(), 0);
    }

    #[test]
    fn percent_callback_filters_other_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback = percent_callback(move |p| sink.lock().unwrap().push(p));

        callback(ProgressEvent::FileSkipped { reason: "missing fileSize".to_string() });
        callback(ProgressEvent::Percent { percent: 42 });

        assert_eq!(*seen.lock().unwrap(), vec![42]);
    }

    #[derive(Default)]
    struct CountingReporter {
        deferred: Arc<Mutex<Vec<String>>>,
    }

    impl ProgressReporter for CountingReporter {
        fn on_file_deferred(&self, path: &str, _url: &str) {
            self.deferred.lock().unwrap().push(path.to_string());
        }
    }

    #[test]
    fn reporter_receives_dispatched_events() {
        let reporter = CountingReporter::default();
        let deferred = reporter.deferred.clone();
        let callback = reporter.into_callback();

        callback(ProgressEvent::FileDeferred {
            path: "mods/a.jar".to_string(),
            url: "https://github.com/a".to_string(),
        });

        assert_eq!(*deferred.lock().unwrap(), vec!["mods/a.jar".to_string()]);
    }
}
