//! Conversion pipeline
//!
//! [`Converter`] wires the pieces together: open the pack, parse its index,
//! copy overrides and resolve remote files concurrently, then serialize the
//! result into a [`ConvertedPack`].

use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::archive::{OutputArchive, SourceArchive};
use crate::catalog::{CatalogClient, CatalogUrl};
use crate::config::ConvertConfig;
use crate::error::{ConvertError, Result};
use crate::http::{AssetFetcher, HttpFetcher};
use crate::manifest::read_manifest;
use crate::notifier::{LogNotifier, UserNotifier};
use crate::overrides::extract_overrides;
use crate::progress::{emit, ProgressCallback, ProgressEvent, ProgressState};
use crate::resolver::{FileOutcome, FileResolver};

/// A file the user has to fetch by hand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredFile {
    pub path: String,
    pub url: String,
}

/// Summary of what happened during one conversion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionReport {
    pub overrides_copied: usize,
    pub files_placed: usize,
    pub files_deferred: usize,
    pub files_failed: usize,
    /// Invalid manifest entries that were ignored
    pub entries_skipped: usize,
    pub size_mismatches: usize,
    pub deferred: Vec<DeferredFile>,
    /// Expected byte total after deferred and failed files were removed
    pub expected_bytes: u64,
    /// Declared size of every placed file, summed
    pub downloaded_bytes: u64,
    /// Last aggregate percentage, 0 when nothing was expected
    pub final_percent: u8,
}

impl ConversionReport {
    /// True when every remote file made it into the output
    pub fn is_complete(&self) -> bool {
        self.files_deferred == 0 && self.files_failed == 0
    }
}

/// The converted archive and the name it should be saved under
#[derive(Debug, Clone)]
pub struct ConvertedPack {
    pub content: Bytes,
    pub filename: String,
    pub report: ConversionReport,
}

/// Converts packs into plain zip archives
#[derive(Clone)]
pub struct Converter {
    config: ConvertConfig,
    fetcher: Arc<dyn AssetFetcher>,
    notifier: Arc<dyn UserNotifier>,
}

impl Converter {
    /// Converter backed by reqwest that only logs manual download requests
    pub fn new(config: ConvertConfig) -> Result<Self> {
        let fetcher = HttpFetcher::from_config(&config)?;
        Ok(Self {
            config,
            fetcher: Arc::new(fetcher),
            notifier: Arc::new(LogNotifier),
        })
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn AssetFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn UserNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Resolve a catalog page URL, download its pack and convert it
    ///
    /// The returned filename comes from the catalog version, not the manifest.
    pub async fn convert_from_catalog_url(
        &self,
        url: &str,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<ConvertedPack> {
        let catalog_url = CatalogUrl::parse(url, &self.config.catalog_host)?;
        let catalog = CatalogClient::new(self.fetcher.clone(), &self.config);
        let asset = catalog.resolve(&catalog_url).await?;

        let mut pack = self.convert_from_url(&asset.url, progress_callback).await?;
        pack.filename = asset.filename;
        Ok(pack)
    }

    /// Download a pack file directly and convert it
    pub async fn convert_from_url(
        &self,
        url: &str,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<ConvertedPack> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConvertError::InvalidDownloadUrl { url: url.to_string() });
        }

        info!("Downloading pack from {}", url);
        let asset = self.fetcher.fetch(url).await.map_err(|e| ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let content_type = asset.content_type.as_deref().unwrap_or_default();
        if !content_type.contains("zip") {
            warn!(
                "Downloaded file from {} has unexpected type '{}'; processing anyway",
                url, content_type
            );
        }

        // A fetched body has no file name of its own
        self.convert(asset.bytes, url, None, progress_callback).await
    }

    /// Convert pack bytes already in memory
    ///
    /// `source_name` is the pack's file name, used in messages and as the
    /// fallback output name when the manifest has no `name`.
    pub async fn convert_archive(
        &self,
        bytes: Bytes,
        source_name: Option<&str>,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<ConvertedPack> {
        let label = source_name.unwrap_or("<input>");
        self.convert(bytes, label, source_name, progress_callback).await
    }

    async fn convert(
        &self,
        bytes: Bytes,
        label: &str,
        source_name: Option<&str>,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<ConvertedPack> {
        let archive = SourceArchive::open(bytes, label)?;
        let manifest = read_manifest(&archive, &self.config.manifest_name).await?;

        for skipped in &manifest.skipped {
            emit(&progress_callback, ProgressEvent::FileSkipped {
                reason: skipped.reason.clone(),
            });
        }

        info!(
            "Converting {}: {} remote files, {} skipped entries",
            archive.name(),
            manifest.files.len(),
            manifest.skipped.len()
        );

        let state = ProgressState::new(manifest.total_declared_size());
        let resolver = FileResolver::new(self.fetcher.clone(), self.notifier.clone(), &self.config);

        let (overrides, outcomes) = tokio::join!(
            extract_overrides(
                &archive,
                &self.config.override_prefixes,
                self.config.max_concurrent_overrides,
                &progress_callback,
            ),
            resolver.resolve_all(&manifest.files, &state, &progress_callback),
        );
        let overrides = overrides?;

        let mut report = ConversionReport {
            overrides_copied: overrides.len(),
            entries_skipped: manifest.skipped.len(),
            expected_bytes: state.total_expected_bytes(),
            downloaded_bytes: state.downloaded_bytes(),
            final_percent: state.percent(),
            ..Default::default()
        };

        let mut output = OutputArchive::new();
        for file in overrides {
            output.insert(file.path, file.bytes);
        }

        for outcome in outcomes {
            if outcome.has_size_mismatch() {
                report.size_mismatches += 1;
            }
            match outcome {
                FileOutcome::Placed { path, bytes, .. } => {
                    report.files_placed += 1;
                    output.insert(path, bytes);
                }
                FileOutcome::Deferred { path, url } => {
                    report.files_deferred += 1;
                    report.deferred.push(DeferredFile { path, url });
                }
                FileOutcome::Failed { .. } => report.files_failed += 1,
            }
        }

        let filename = manifest
            .archive_filename()
            .or_else(|| source_name.and_then(own_file_name))
            .unwrap_or_else(|| self.config.default_output_name.clone());

        let compression_level = self.config.compression_level;
        let entry_count = output.len();
        let content = tokio::task::spawn_blocking(move || output.into_zip(compression_level))
            .await
            .map_err(|source| ConvertError::TaskFailed {
                context: "writing the output archive".to_string(),
                source,
            })??;

        info!(
            "Created {} ({} entries, {} bytes): {} placed, {} deferred, {} failed",
            filename,
            entry_count,
            content.len(),
            report.files_placed,
            report.files_deferred,
            report.files_failed
        );

        Ok(ConvertedPack { content, filename, report })
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// File name component of the source, kept as is
fn own_file_name(source_name: &str) -> Option<String> {
    let name = Path::new(source_name).file_name()?.to_str()?;
    debug!("Naming output after source {}", name);
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_names_are_kept_verbatim() {
        assert_eq!(own_file_name("Cool Pack 1.0.mrpack").as_deref(), Some("Cool Pack 1.0.mrpack"));
        assert_eq!(own_file_name("/home/me/packs/pack.mrpack").as_deref(), Some("pack.mrpack"));
        assert_eq!(own_file_name("").as_deref(), None);
    }

    #[test]
    fn report_completeness() {
        let mut report = ConversionReport::default();
        assert!(report.is_complete());
        report.files_deferred = 1;
        assert!(!report.is_complete());
    }
}
