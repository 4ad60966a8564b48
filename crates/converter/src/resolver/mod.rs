//! Remote file resolution
//!
//! Every valid manifest file ends up in exactly one [`FileOutcome`]: fetched
//! and placed, deferred to the user, or failed. Only placed files reach the
//! output archive; the other two shrink the expected byte total.

pub mod trust;

pub use trust::{DeferReason, HostPolicy};

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ConvertConfig;
use crate::http::AssetFetcher;
use crate::manifest::ManifestFile;
use crate::notifier::UserNotifier;
use crate::progress::{emit, ProgressCallback, ProgressEvent, ProgressState};

/// Result of resolving one manifest file
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Placed {
        path: String,
        bytes: Bytes,
        declared_size: u64,
    },
    Deferred {
        path: String,
        url: String,
    },
    Failed {
        path: String,
        url: String,
        error: String,
    },
}

impl FileOutcome {
    pub fn path(&self) -> &str {
        match self {
            FileOutcome::Placed { path, .. }
            | FileOutcome::Deferred { path, .. }
            | FileOutcome::Failed { path, .. } => path,
        }
    }

    pub fn is_placed(&self) -> bool {
        matches!(self, FileOutcome::Placed { .. })
    }

    /// True when the fetched length differs from the declared size
    pub fn has_size_mismatch(&self) -> bool {
        match self {
            FileOutcome::Placed { bytes, declared_size, .. } => {
                bytes.len() as u64 != *declared_size
            }
            _ => false,
        }
    }
}

/// Fetches trusted manifest files and defers the rest to a [`UserNotifier`]
#[derive(Clone)]
pub struct FileResolver {
    fetcher: Arc<dyn AssetFetcher>,
    notifier: Arc<dyn UserNotifier>,
    policy: HostPolicy,
    config: ConvertConfig,
}

impl FileResolver {
    pub fn new(
        fetcher: Arc<dyn AssetFetcher>,
        notifier: Arc<dyn UserNotifier>,
        config: &ConvertConfig,
    ) -> Self {
        Self {
            fetcher,
            notifier,
            policy: HostPolicy::from_config(config),
            config: config.clone(),
        }
    }

    /// Resolve all files concurrently; outcomes arrive in completion order
    pub async fn resolve_all(
        &self,
        files: &[ManifestFile],
        state: &ProgressState,
        progress_callback: &Option<ProgressCallback>,
    ) -> Vec<FileOutcome> {
        let concurrency = self.config.download_concurrency(files.len());
        info!("Resolving {} remote files ({} at a time)", files.len(), concurrency);

        stream::iter(files)
            .map(|file| self.resolve(file, state, progress_callback))
            .buffer_unordered(concurrency)
            .collect()
            .await
    }

    /// Resolve a single file, updating `state` and emitting its events
    pub async fn resolve(
        &self,
        file: &ManifestFile,
        state: &ProgressState,
        progress_callback: &Option<ProgressCallback>,
    ) -> FileOutcome {
        let url = file.primary_url();

        if let Some(reason) = self.policy.check(file) {
            debug!("Deferring {} ({:?})", file.path, reason);
            self.notifier.prompt_manual_download(&file.path, url);
            state.reduce_total(file.file_size);
            emit(progress_callback, ProgressEvent::FileDeferred {
                path: file.path.clone(),
                url: url.to_string(),
            });
            return FileOutcome::Deferred {
                path: file.path.clone(),
                url: url.to_string(),
            };
        }

        let asset = match self.fetcher.fetch(url).await {
            Ok(asset) => asset,
            Err(e) => {
                warn!("Failed to download {} from {}: {}", file.path, url, e);
                state.reduce_total(file.file_size);
                emit(progress_callback, ProgressEvent::FileFailed {
                    path: file.path.clone(),
                    url: url.to_string(),
                    error: e.to_string(),
                });
                emit(progress_callback, ProgressEvent::Percent { percent: state.percent() });
                return FileOutcome::Failed {
                    path: file.path.clone(),
                    url: url.to_string(),
                    error: e.to_string(),
                };
            }
        };

        let actual = asset.bytes.len() as u64;
        if actual != file.file_size {
            warn!(
                "Size mismatch for {}: expected {} bytes, got {}",
                file.path, file.file_size, actual
            );
            emit(progress_callback, ProgressEvent::SizeMismatch {
                path: file.path.clone(),
                expected: file.file_size,
                actual,
            });
        }

        let percent = state.record_downloaded(file.file_size);
        debug!("Placed {} ({} bytes), {}% done", file.path, actual, percent);
        emit(progress_callback, ProgressEvent::FilePlaced {
            path: file.path.clone(),
            size: actual,
        });
        emit(progress_callback, ProgressEvent::Percent { percent });

        FileOutcome::Placed {
            path: file.path.clone(),
            bytes: asset.bytes,
            declared_size: file.file_size,
        }
    }
}

impl std::fmt::Debug for FileResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileResolver")
            .field("policy", &self.policy)
            .field("max_concurrent_downloads", &self.config.max_concurrent_downloads)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConvertConfigBuilder;
    use crate::http::HttpFetcher;
    use std::sync::Mutex;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[derive(Default)]
    struct RecordingNotifier {
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl UserNotifier for RecordingNotifier {
        fn prompt_manual_download(&self, path: &str, url: &str) {
            self.prompts.lock().unwrap().push((path.to_string(), url.to_string()));
        }
    }

    fn file(path: &str, url: String, size: u64) -> ManifestFile {
        ManifestFile {
            path: path.to_string(),
            downloads: vec![url],
            file_size: size,
            hashes: Default::default(),
            env: None,
        }
    }

    fn resolver_for(server: &MockServer, notifier: Arc<RecordingNotifier>) -> FileResolver {
        let config = ConvertConfigBuilder::new()
            .trusted_cdn_prefix(format!("{}/", server.uri()))
            .build();
        let fetcher = HttpFetcher::from_config(&config).unwrap();
        FileResolver::new(Arc::new(fetcher), notifier, &config)
    }

    fn capture() -> (Option<ProgressCallback>, Arc<Mutex<Vec<ProgressEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let callback: ProgressCallback = Arc::new(move |event| sink.lock().unwrap().push(event));
        (Some(callback), events)
    }

    #[tokio::test]
    async fn trusted_file_is_placed_and_counted() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/a.jar"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 100]))
            .expect(1)
            .mount(&mock_server)
            .await;

        let notifier = Arc::new(RecordingNotifier::default());
        let resolver = resolver_for(&mock_server, notifier.clone());
        let files = vec![file("mods/a.jar", format!("{}/data/a.jar", mock_server.uri()), 100)];
        let state = ProgressState::new(100);
        let (callback, events) = capture();

        let outcomes = resolver.resolve_all(&files, &state, &callback).await;

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_placed());
        assert!(!outcomes[0].has_size_mismatch());
        assert_eq!(state.percent(), 100);
        assert!(notifier.prompts.lock().unwrap().is_empty());
        assert_eq!(events.lock().unwrap().last(), Some(&ProgressEvent::Percent { percent: 100 }));
    }

    #[tokio::test]
    async fn blocked_host_is_deferred_without_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let notifier = Arc::new(RecordingNotifier::default());
        let resolver = resolver_for(&mock_server, notifier.clone());
        let url = "https://github.com/x/y/releases/download/1/y.jar".to_string();
        let files = vec![file("mods/y.jar", url.clone(), 50)];
        let state = ProgressState::new(50);

        let outcomes = resolver.resolve_all(&files, &state, &None).await;

        assert_eq!(
            outcomes,
            vec![FileOutcome::Deferred { path: "mods/y.jar".to_string(), url: url.clone() }]
        );
        assert_eq!(state.total_expected_bytes(), 0);
        assert_eq!(*notifier.prompts.lock().unwrap(), vec![("mods/y.jar".to_string(), url)]);
    }

    #[tokio::test]
    async fn failed_download_shrinks_total() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok.jar"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 100]))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone.jar"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let notifier = Arc::new(RecordingNotifier::default());
        let resolver = resolver_for(&mock_server, notifier);
        let files = vec![
            file("mods/ok.jar", format!("{}/ok.jar", mock_server.uri()), 100),
            file("mods/gone.jar", format!("{}/gone.jar", mock_server.uri()), 300),
        ];
        let state = ProgressState::new(400);
        let (callback, events) = capture();

        let outcomes = resolver.resolve_all(&files, &state, &callback).await;

        assert_eq!(outcomes.iter().filter(|o| o.is_placed()).count(), 1);
        let failed = outcomes.iter().find(|o| o.path() == "mods/gone.jar").unwrap();
        assert!(matches!(failed, FileOutcome::Failed { error, .. } if error.contains("404")));
        assert_eq!(state.total_expected_bytes(), 100);
        assert_eq!(state.percent(), 100);
        let events = events.lock().unwrap();
        assert!(events.iter().any(|e| matches!(e, ProgressEvent::FileFailed { .. })));
    }

    #[tokio::test]
    async fn size_mismatch_is_reported_but_placed() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 90]))
            .mount(&mock_server)
            .await;

        let notifier = Arc::new(RecordingNotifier::default());
        let resolver = resolver_for(&mock_server, notifier);
        let files = vec![file("mods/short.jar", format!("{}/short.jar", mock_server.uri()), 100)];
        let state = ProgressState::new(100);
        let (callback, events) = capture();

        let outcomes = resolver.resolve_all(&files, &state, &callback).await;

        assert!(outcomes[0].is_placed());
        assert!(outcomes[0].has_size_mismatch());
        assert_eq!(state.downloaded_bytes(), 100);
        assert!(events.lock().unwrap().contains(&ProgressEvent::SizeMismatch {
            path: "mods/short.jar".to_string(),
            expected: 100,
            actual: 90,
        }));
    }

    #[tokio::test]
    async fn capped_fan_out_still_resolves_everything() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 10]))
            .expect(5)
            .mount(&mock_server)
            .await;

        let config = ConvertConfigBuilder::new()
            .trusted_cdn_prefix(format!("{}/", mock_server.uri()))
            .max_concurrent_downloads(2)
            .build();
        let resolver = FileResolver::new(
            Arc::new(HttpFetcher::from_config(&config).unwrap()),
            Arc::new(RecordingNotifier::default()),
            &config,
        );
        let files: Vec<_> = (0..5)
            .map(|i| {
                file(&format!("mods/{}.jar", i), format!("{}/{}.jar", mock_server.uri(), i), 10)
            })
            .collect();
        let state = ProgressState::new(50);

        let outcomes = resolver.resolve_all(&files, &state, &None).await;
        assert_eq!(outcomes.iter().filter(|o| o.is_placed()).count(), 5);
        assert_eq!(state.percent(), 100);
    }
}
