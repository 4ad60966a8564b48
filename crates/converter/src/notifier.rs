//! Manual download notification
//!
//! Files hosted outside the trusted CDN are never fetched automatically.
//! The resolver hands them to a [`UserNotifier`] so the caller can decide how
//! to surface them (open a browser, print a message, collect them for a UI).

use tracing::warn;

/// Capability for asking the user to fetch a file by hand
pub trait UserNotifier: Send + Sync {
    /// `path` is where the file belongs inside the output archive
    fn prompt_manual_download(&self, path: &str, url: &str);
}

/// Notifier that only logs the request
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl UserNotifier for LogNotifier {
    fn prompt_manual_download(&self, path: &str, url: &str) {
        warn!(
            "A file ({}) needs to be downloaded manually from an external source: {}. \
             Place it at that path inside the final zip.",
            path, url
        );
    }
}

impl<T: UserNotifier + ?Sized> UserNotifier for std::sync::Arc<T> {
    fn prompt_manual_download(&self, path: &str, url: &str) {
        (**self).prompt_manual_download(path, url);
    }
}
